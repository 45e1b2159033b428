//! Server configuration
//!
//! Static settings loaded once at startup, either from a JSON file or
//! from defaults. Every field has a default so a partial file is valid.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_address: String,
    /// Port the listener binds to
    pub port: u16,
    /// Maximum number of concurrently admitted sessions
    pub max_clients: usize,
    /// Prefix marking a line as a command
    pub command_prefix: String,
    /// Capacity of each session's outbound queue
    pub outbound_buffer: usize,
    /// Longest accepted inbound line in bytes
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5558,
            max_clients: 100,
            command_prefix: ":".to_string(),
            outbound_buffer: 32,
            max_line_length: 4096,
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file, or use defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is within its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid {
                field: "max_clients",
                reason: "must be at least 1",
            });
        }
        if self.command_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "command_prefix",
                reason: "must not be empty",
            });
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::Invalid {
                field: "outbound_buffer",
                reason: "must be at least 1",
            });
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::Invalid {
                field: "max_line_length",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// `bind_address:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.max_clients, 100);
        assert_eq!(config.port, 5558);
        assert_eq!(config.command_prefix, ":");
        assert_eq!(config.listen_addr(), "0.0.0.0:5558");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"max_clients": 5, "command_prefix": "/"}"#).unwrap();
        assert_eq!(config.max_clients, 5);
        assert_eq!(config.command_prefix, "/");
        assert_eq!(config.port, 5558);
    }

    #[test]
    fn test_zero_max_clients_rejected() {
        let config = ServerConfig {
            max_clients: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "max_clients",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = ServerConfig {
            command_prefix: String::new(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(ServerConfig::load(None).unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServerConfig::load(Some(Path::new("/nonexistent/room_relay.json")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
