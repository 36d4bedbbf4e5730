//! Non-event frames sharing the AG-UI socket, and close codes.
//!
//! # Protocol
//!
//! 1. Both sides exchange JSON text frames. A frame is either an
//!    [`EventRecord`] or a [`ControlFrame`].
//! 2. While connected, the client sends `{"type":"ping","timestamp":...}`
//!    every heartbeat interval. Peers may answer with a `pong`; nothing
//!    depends on it.
//! 3. A client-initiated disconnect sends close code
//!    [`CloseCode::NORMAL`].

use serde::{Deserialize, Serialize};

use super::event::{DecodeError, EventRecord, now_millis};

/// Heartbeat frames. Never dispatched as events.
///
/// ```json
/// {"type":"ping","timestamp":1729123456789}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    Ping { timestamp: i64 },
    Pong { timestamp: i64 },
}

impl ControlFrame {
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: now_millis(),
        }
    }

    pub fn pong() -> Self {
        Self::Pong {
            timestamp: now_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A decoded inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Control(ControlFrame),
    Event(EventRecord),
}

impl InboundFrame {
    /// Decode a text frame, trying control frames first.
    ///
    /// Event names never collide with `ping`/`pong`, so the order only
    /// matters for speed.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        if let Ok(control) = serde_json::from_str::<ControlFrame>(text) {
            return Ok(Self::Control(control));
        }
        let record = serde_json::from_str::<EventRecord>(text)?;
        Ok(Self::Event(record))
    }
}

/// Well-known WebSocket close codes used on the AG-UI socket.
pub struct CloseCode;

impl CloseCode {
    /// Client-initiated disconnect.
    pub const NORMAL: u16 = 1000;

    /// The peer is shutting down.
    pub const GOING_AWAY: u16 = 1001;

    /// A close frame arrived without a status code. Never sent on the wire.
    pub const NO_STATUS: u16 = 1005;

    /// Connection lost without a close frame. Never sent on the wire.
    pub const ABNORMAL: u16 = 1006;

    pub const INTERNAL_ERROR: u16 = 1011;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::events::{ButtonClicked, EventKind};

    #[test]
    fn test_ping_wire_format() {
        let json = ControlFrame::Ping { timestamp: 42 }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"ping","timestamp":42}"#);
    }

    #[test]
    fn test_decode_dispatches_on_type() {
        let ping = InboundFrame::decode(r#"{"type":"pong","timestamp":7}"#).unwrap();
        assert_eq!(ping, InboundFrame::Control(ControlFrame::Pong { timestamp: 7 }));

        let record = EventRecord::new(
            ButtonClicked {
                button_id: "buy".into(),
                action: Some("open_order_ticket".into()),
            },
            "test",
        );
        let text = record.to_json().unwrap();
        match InboundFrame::decode(&text).unwrap() {
            InboundFrame::Event(decoded) => {
                assert_eq!(decoded.kind(), EventKind::ButtonClicked);
                assert_eq!(decoded, record);
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(InboundFrame::decode("not json").is_err());
        assert!(InboundFrame::decode(r#"{"type":"ping"}"#).is_err());
    }
}
