//! Wire objects for the AG-UI event protocol.
//!
//! This crate has no runtime: it defines what travels over the socket
//! ([`objects::EventRecord`], [`objects::ws::ControlFrame`]) and how a client
//! connection is configured ([`config::TransportConfig`]). The engine lives in
//! `agui-core`, the relay endpoint in `agui-server`.

pub mod config;
pub mod objects;
