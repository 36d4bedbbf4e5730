//! The event envelope shared by every producer and consumer.
//!
//! On the wire an event is a single JSON object:
//!
//! ```json
//! {
//!   "id": "0192f0c4-...",
//!   "type": "wallet.balance_changed",
//!   "data": {"wallet_id": "w1", "old_balance": 100.0, "new_balance": 150.0},
//!   "timestamp": 1729123456789,
//!   "source": "agui-client",
//!   "priority": "medium"
//! }
//! ```
//!
//! `target`, `metadata`, `correlation_id` and `retry_count` are omitted when
//! unset.

use serde::{Deserialize, Serialize};

use super::events::{AguiEvent, EventKind};

/// Source name used when the producer does not configure one.
pub const DEFAULT_SOURCE: &str = "agui-client";

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Delivery priority carried by every event.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A fully-built event: typed payload plus envelope fields.
///
/// `id`, the payload and `timestamp` are fixed at construction. The optional
/// envelope fields can be set with the `with_*` builders before the record
/// is handed to a bus or transport.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEvent")]
pub struct EventRecord {
    id: String,
    event: AguiEvent,
    timestamp: i64,
    source: String,
    target: Option<String>,
    priority: Priority,
    metadata: Option<serde_json::Value>,
    correlation_id: Option<String>,
    retry_count: Option<u32>,
}

impl EventRecord {
    /// Build a record with a fresh id and the current timestamp.
    ///
    /// Ids are UUIDv7 strings: a millisecond time prefix followed by random
    /// bits. They are unique in practice but not guaranteed to be.
    pub fn new(event: impl Into<AguiEvent>, source: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            event: event.into(),
            timestamp: now_millis(),
            source: source.into(),
            target: None,
            priority: Priority::default(),
            metadata: None,
            correlation_id: None,
            retry_count: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The typed payload.
    pub fn event(&self) -> &AguiEvent {
        &self.event
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Unix milliseconds at construction.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn retry_count(&self) -> Option<u32> {
        self.retry_count
    }

    /// Serialize to the JSON text frame format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for EventRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        WireEventRef {
            id: &self.id,
            kind: self.event.kind(),
            data: PayloadRef(&self.event),
            timestamp: self.timestamp,
            source: &self.source,
            target: self.target.as_deref(),
            priority: self.priority,
            metadata: self.metadata.as_ref(),
            correlation_id: self.correlation_id.as_deref(),
            retry_count: self.retry_count,
        }
        .serialize(serializer)
    }
}

/// Errors produced while turning wire JSON into an [`EventRecord`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown event type `{0}`")]
    UnknownKind(String),
    #[error("payload does not match `{kind}`: {source}")]
    Payload {
        kind: EventKind,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WireEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
    timestamp: i64,
    #[serde(default = "default_source")]
    source: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    #[serde(default, alias = "correlationId")]
    correlation_id: Option<String>,
    #[serde(default, alias = "retryCount")]
    retry_count: Option<u32>,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

impl TryFrom<WireEvent> for EventRecord {
    type Error = DecodeError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let kind: EventKind = wire
            .kind
            .parse()
            .map_err(|_| DecodeError::UnknownKind(wire.kind.clone()))?;
        let event = AguiEvent::from_parts(kind, wire.data)
            .map_err(|source| DecodeError::Payload { kind, source })?;
        Ok(Self {
            id: wire.id,
            event,
            timestamp: wire.timestamp,
            source: wire.source,
            target: wire.target,
            priority: wire.priority,
            metadata: wire.metadata,
            correlation_id: wire.correlation_id,
            retry_count: wire.retry_count,
        })
    }
}

#[derive(Serialize)]
struct WireEventRef<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: EventKind,
    data: PayloadRef<'a>,
    timestamp: i64,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_count: Option<u32>,
}

struct PayloadRef<'a>(&'a AguiEvent);

impl Serialize for PayloadRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize_payload(serializer)
    }
}
