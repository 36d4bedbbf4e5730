//! Configuration for the event bus.
//!
//! Plain serde types so embedding applications can load them from whatever
//! format they already use. Every field has a default.

use agui_sdk::config::TransportConfig;
use agui_sdk::objects::event::DEFAULT_SOURCE;
use serde::{Deserialize, Serialize};

/// Configuration for one [`EventBus`](crate::bus::EventBus).
///
/// ```json
/// {
///   "source": "trading-dashboard",
///   "history_size": 500,
///   "transport": {"url": "ws://localhost:8000/ws/agui", "reconnect_attempts": 3}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Stamped as `source` on every record built by `emit`.
    pub source: String,

    /// Maximum number of records kept in the event history.
    pub history_size: usize,

    pub transport: TransportConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            history_size: 1000,
            transport: TransportConfig::default(),
        }
    }
}
