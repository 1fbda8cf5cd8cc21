//! # Configuration Management
//!
//! Centralized configuration for server and client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment-variable overrides via `from_env()`
//! - Direct instantiation with defaults

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest number of datagrams dispatched concurrently by default.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 16;

/// Default deadline the client waits for a reply.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Main configuration structure containing all configurable settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("VEHICLE_PROTOCOL_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(size) = std::env::var("VEHICLE_PROTOCOL_WORKER_POOL_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.server.worker_pool_size = val;
            }
        }

        if let Ok(timeout) = std::env::var("VEHICLE_PROTOCOL_RESPONSE_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.response_timeout = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns the list of validation errors; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors
    }

    /// Validate and return a Result - convenience method.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server listen address (e.g., "0.0.0.0:9000")
    pub address: String,

    /// Number of datagrams dispatched concurrently; when every slot is
    /// taken the receive loop pauses and the socket buffer sheds overload
    pub worker_pool_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:9000"),
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:9000')",
                self.address
            ));
        }

        if self.worker_pool_size == 0 {
            errors.push("Worker pool size must be greater than 0".to_string());
        } else if self.worker_pool_size > 4096 {
            errors.push(format!(
                "Worker pool size very high: {} (ensure system resources can support this)",
                self.worker_pool_size
            ));
        }

        errors
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Target server address
    pub address: String,

    /// Deadline for waiting for a reply to one request
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9000"),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: '127.0.0.1:9000')",
                self.address
            ));
        }

        if self.response_timeout.as_millis() < 100 {
            errors.push("Response timeout too short (minimum: 100ms)".to_string());
        } else if self.response_timeout.as_secs() > 300 {
            errors.push("Response timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(NetworkConfig::default().validate().is_empty());
    }

    #[test]
    fn bad_address_and_zero_pool_are_flagged() {
        let mut config = NetworkConfig::default();
        config.server.address = "nonsense".to_string();
        config.server.worker_pool_size = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn toml_round_trip_preserves_timeouts() {
        let toml = r#"
            [server]
            address = "127.0.0.1:4400"
            worker_pool_size = 8

            [client]
            address = "127.0.0.1:4400"
            response_timeout = 2500
        "#;
        let config = NetworkConfig::from_toml(toml).expect("parses");
        assert_eq!(config.server.worker_pool_size, 8);
        assert_eq!(config.client.response_timeout, Duration::from_millis(2500));
    }
}
