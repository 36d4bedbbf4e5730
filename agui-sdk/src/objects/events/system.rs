//! Connection lifecycle and application-wide notices.
//!
//! The transport reports its own state changes through the first five
//! events, so UI layers can render an offline indicator from
//! `system.connection_failed` without touching the transport directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOpened {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionClosed {
    pub code: u16,
    pub reason: String,
}

/// Emitted before each backoff timer is armed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectScheduled {
    /// 1-based attempt number.
    pub attempt: u32,
    pub delay_ms: u64,
}

/// Terminal: every reconnection attempt has been used up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionFailed {
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemError {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemNotification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}
