//! Client configuration
//!
//! Loads connection defaults from a TOML file such as:
//!
//! ```toml
//! fallback_host = "raspberrypi.local"
//!
//! [endpoint]
//! host = "192.168.4.1"
//! port = 8888
//!
//! [credentials]
//! username = "admin"
//! password = "123456"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::client::{ConnectOptions, DEFAULT_FALLBACK_HOST};

/// Default configuration file name
pub const CONFIG_FILE: &str = "rasptank.toml";

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Where the device lives
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EndpointConfig {
    /// Device host; blank means the fallback host
    #[serde(default)]
    pub host: String,
    /// Device port; absent means 8888
    pub port: Option<u16>,
}

/// Login sent after the socket opens
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Console configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Host used when the endpoint host is blank
    #[serde(default = "default_fallback_host")]
    pub fallback_host: String,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

fn default_fallback_host() -> String {
    DEFAULT_FALLBACK_HOST.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fallback_host: default_fallback_host(),
            endpoint: EndpointConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Raw connection fields for the connection manager
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.endpoint.host.clone(),
            port: self
                .endpoint
                .port
                .map(|port| port.to_string())
                .unwrap_or_default(),
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ClientConfig::load(&temp_dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.fallback_host, "localhost");
        assert_eq!(config.connect_options(), ConnectOptions::default());
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
fallback_host = "raspberrypi.local"

[endpoint]
host = "192.168.4.1"
port = 9000

[credentials]
username = "pilot"
password = "secret"
"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.fallback_host, "raspberrypi.local");

        let options = config.connect_options();
        assert_eq!(options.host, "192.168.4.1");
        assert_eq!(options.port, "9000");
        assert_eq!(options.username, "pilot");
        assert_eq!(options.password, "secret");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ClientConfig = toml::from_str("[endpoint]\nhost = \"tank\"\n").unwrap();
        assert_eq!(config.fallback_host, "localhost");
        assert_eq!(config.endpoint.port, None);
        assert!(config.credentials.username.is_empty());
    }

    #[test]
    fn test_invalid_port_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[endpoint]\nport = 70000\n").unwrap();

        assert!(matches!(ClientConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);

        let mut config = ClientConfig::default();
        config.endpoint.host = "10.0.0.5".to_string();
        config.endpoint.port = Some(8889);
        config.save(&path).unwrap();

        assert_eq!(ClientConfig::load(&path).unwrap(), config);
    }
}
