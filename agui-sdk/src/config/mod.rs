//! Client-side configuration types.
//!
//! These are plain serde structs with defaults for every field, so an
//! embedding application can load them from whatever format it already uses
//! and only override what it needs.

mod duration_ms;
mod transport;

pub use transport::{ConfigError, DEFAULT_URL, TransportConfig};
