//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/agui";

/// Errors reported by [`TransportConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported url scheme `{0}`, expected ws or wss")]
    UnsupportedScheme(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Connection parameters for one logical AG-UI connection.
///
/// Durations are written as milliseconds:
///
/// ```toml
/// url = "wss://dashboard.example.com/ws/agui"
/// reconnect_attempts = 5
/// reconnect_delay_ms = 1000
/// heartbeat_interval_ms = 30000
/// timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub url: Url,

    /// How many times the transport retries after losing or failing to
    /// open a connection before giving up.
    pub reconnect_attempts: u32,

    /// Base delay for exponential backoff: attempt `n` waits
    /// `reconnect_delay * 2^(n-1)`.
    #[serde(rename = "reconnect_delay_ms", with = "super::duration_ms")]
    pub reconnect_delay: Duration,

    #[serde(rename = "heartbeat_interval_ms", with = "super::duration_ms")]
    pub heartbeat_interval: Duration,

    /// Upper bound on a single connection attempt.
    #[serde(rename = "timeout_ms", with = "super::duration_ms")]
    pub timeout: Duration,

    /// Not supported by the WebSocket client. Accepted so shared config
    /// files load; the transport logs a warning when set.
    pub compression: bool,

    /// Not supported beyond `wss://`. Same handling as `compression`.
    pub encryption: bool,
}

impl TransportConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    /// Check the values the transport cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::ZeroDuration("reconnect_delay_ms"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("heartbeat_interval_ms"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("timeout_ms"));
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).expect("valid default url"),
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1000),
            heartbeat_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            compression: false,
            encryption: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.url.as_str(), DEFAULT_URL);
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TransportConfig = serde_json::from_str(
            r#"{"url":"wss://example.com/ws/agui","reconnect_attempts":3,"reconnect_delay_ms":100}"#,
        )
        .unwrap();
        assert_eq!(config.url.scheme(), "wss");
        assert_eq!(config.reconnect_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_millis(100));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_http_and_zero_delay() {
        let http = TransportConfig::new(Url::parse("http://example.com").unwrap());
        assert!(matches!(
            http.validate(),
            Err(ConfigError::UnsupportedScheme(s)) if s == "http"
        ));

        let zero = TransportConfig {
            reconnect_delay: Duration::ZERO,
            ..TransportConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(ConfigError::ZeroDuration("reconnect_delay_ms"))
        ));
    }
}
