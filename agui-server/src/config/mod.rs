//! Configuration module for agui-server.
//!
//! Handles loading configuration from the TOML file and CLI arguments.

pub mod file;

pub use file::{FileConfig, RelayConfig, ServerConfig};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, or fall back to defaults if it does not exist
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let mut config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(listen) = self.listen_override {
            config.server.listen = listen;
        }

        self.validate(&config)?;
        Ok(config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<FileConfig, ConfigError> {
        self.load()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.relay.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "relay.channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "agui-server-{name}-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loader = ConfigLoader::new("/nonexistent/agui-server.toml", None);
        assert_eq!(loader.load().unwrap(), FileConfig::default());
    }

    #[test]
    fn test_listen_override_wins() {
        let path = temp_config("override", "[server]\nlisten = \"127.0.0.1:9000\"\n");
        let listen: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = ConfigLoader::new(&path, Some(listen)).load().unwrap();
        assert_eq!(config.server.listen, listen);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let path = temp_config("zero", "[relay]\nchannel_capacity = 0\n");
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let path = temp_config("invalid", "[relay\n");
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        std::fs::remove_file(path).unwrap();
    }
}
