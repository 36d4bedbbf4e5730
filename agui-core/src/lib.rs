#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Client runtime for the AG-UI event protocol.
//!
//! [`transport`] keeps one best-effort WebSocket connection alive and owns
//! the outbound queue. [`bus`] layers middleware, history and typed
//! subscriptions on top of it.

pub mod bus;
pub mod config;
pub mod transport;
pub mod utils;
