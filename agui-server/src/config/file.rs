//! TOML file configuration structures.
//!
//! These structs directly map to the `agui-server.toml` file format. Every
//! section and key is optional.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

/// Relay configuration section. `echo` can be changed with SIGHUP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Events buffered per client before a slow client starts skipping.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Send events back to the client that published them.
    #[serde(default)]
    pub echo: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            echo: false,
        }
    }
}

fn default_channel_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:9000"

[relay]
channel_capacity = 64
echo = true
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.relay.channel_capacity, 64);
        assert!(config.relay.echo);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.server.listen.to_string(), "0.0.0.0:8000");
        assert_eq!(config.relay.channel_capacity, 1024);
        assert!(!config.relay.echo);
    }

    #[test]
    fn test_partial_section() {
        let config: FileConfig = toml::from_str("[relay]\necho = true\n").unwrap();
        assert!(config.relay.echo);
        assert_eq!(config.relay.channel_capacity, 1024);
    }
}
