//! Best-effort duplex connection to a single AG-UI endpoint.
//!
//! One actor task per transport owns the socket, the reconnect timer, the
//! heartbeat timer and the outbound queue. Callers talk to it through a
//! cloneable [`TransportHandle`]; everything the actor observes comes back
//! on a [`TransportOutputReceiver`] in arrival order.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Connected
//!                               ▲                    │ lost
//!                               │ timer              ▼
//!                               └──────────── Reconnecting
//!                                                    │ attempts exhausted
//!                                                    ▼
//!                                                  Failed
//! ```
//!
//! No transport operation returns an error to its caller. Socket errors,
//! timeouts and malformed frames become counters in
//! [`PerformanceMetrics`], log lines, and [`TransportNotice`]s.

mod actor;
mod connector;
mod metrics;
#[cfg(test)]
pub(crate) mod testing;
mod tungstenite;

pub use actor::{TransportHandle, spawn_transport};
pub use connector::{CloseReason, Connection, Connector, Frame, FrameSink, FrameStream};
pub use metrics::PerformanceMetrics;
pub use tungstenite::TungsteniteConnector;

use std::fmt;
use std::time::Duration;

use agui_sdk::objects::events::{
    ConnectionClosed, ConnectionFailed, ConnectionOpened, ReconnectScheduled, SystemError,
    SystemEvent,
};
use agui_sdk::objects::{EventRecord, Priority};
use tokio::sync::mpsc;

/// Source name stamped on records built from [`TransportNotice`]s.
pub const TRANSPORT_SOURCE: &str = "transport";

/// Errors produced while opening or using a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection refused: {0}")]
    Refused(String),

    #[error("connection closed")]
    Closed,
}

/// Lifecycle state of one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// A backoff timer is armed for the next attempt.
    Reconnecting,
    /// Every reconnection attempt failed. Only an explicit `connect` or a
    /// `send` leaves this state.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lifecycle notifications emitted by the transport actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportNotice {
    Connected { url: String },
    Disconnected { code: u16, reason: String },
    Reconnecting { attempt: u32, delay: Duration },
    ConnectionFailed { attempts: u32 },
    Error { message: String },
}

impl TransportNotice {
    pub fn into_event(self) -> SystemEvent {
        match self {
            TransportNotice::Connected { url } => SystemEvent::Connected(ConnectionOpened { url }),
            TransportNotice::Disconnected { code, reason } => {
                SystemEvent::Disconnected(ConnectionClosed { code, reason })
            }
            TransportNotice::Reconnecting { attempt, delay } => {
                SystemEvent::Reconnecting(ReconnectScheduled {
                    attempt,
                    delay_ms: delay.as_millis().min(u64::MAX as u128) as u64,
                })
            }
            TransportNotice::ConnectionFailed { attempts } => {
                SystemEvent::ConnectionFailed(ConnectionFailed { attempts })
            }
            TransportNotice::Error { message } => SystemEvent::Error(SystemError { message }),
        }
    }

    /// Build the `system.*` record the bus dispatches for this notice.
    pub fn into_record(self) -> EventRecord {
        let priority = match &self {
            TransportNotice::ConnectionFailed { .. } => Priority::Critical,
            TransportNotice::Disconnected { .. } | TransportNotice::Error { .. } => Priority::High,
            TransportNotice::Connected { .. } | TransportNotice::Reconnecting { .. } => {
                Priority::Medium
            }
        };
        EventRecord::new(self.into_event(), TRANSPORT_SOURCE).with_priority(priority)
    }
}

/// Everything the transport actor reports, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOutput {
    Event(EventRecord),
    Notice(TransportNotice),
}

/// Sender half of the transport output channel.
pub type TransportOutputSender = mpsc::UnboundedSender<TransportOutput>;
/// Receiver half of the transport output channel.
pub type TransportOutputReceiver = mpsc::UnboundedReceiver<TransportOutput>;

/// Create a new transport output channel.
///
/// Unbounded: inbound events are never dropped for backpressure, matching
/// the unbounded outbound queue.
pub fn transport_output_channel() -> (TransportOutputSender, TransportOutputReceiver) {
    mpsc::unbounded_channel()
}
