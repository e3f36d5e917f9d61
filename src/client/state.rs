//! Connection state and operator inputs
//!
//! Resolves the raw host/port/credential fields into a concrete endpoint and
//! credential pair, applying the device's documented fallbacks.

use std::fmt;

use super::{ClientError, ClientResult};
use crate::protocol::{
    coerce_integer, credential_frame, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME,
};

/// State of the device connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        };
        f.write_str(label)
    }
}

/// Raw connection fields as the operator typed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Device host; blank means the fallback host
    pub host: String,
    /// Device port as text; blank or non-numeric means 8888
    pub port: String,
    /// Username; blank means `admin`
    pub username: String,
    /// Password; blank means `123456`
    pub password: String,
}

impl ConnectOptions {
    /// Create options for a host and port with blank credentials
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set the credential fields
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }
}

/// A resolved device endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from a host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve operator input into an endpoint.
    ///
    /// A blank host falls back to `fallback_host`. A blank, non-numeric or
    /// zero port falls back to [`DEFAULT_PORT`]; a parsed port outside
    /// 1-65535 is rejected.
    pub fn resolve(host: &str, port: &str, fallback_host: &str) -> ClientResult<Self> {
        let host = match host.trim() {
            "" => fallback_host.trim(),
            given => given,
        };
        if host.is_empty() {
            return Err(ClientError::InvalidEndpoint(
                "no host given and no fallback host configured".to_string(),
            ));
        }

        let port = match coerce_integer(port.trim()) {
            0 => DEFAULT_PORT,
            parsed => u16::try_from(parsed).map_err(|_| {
                ClientError::InvalidEndpoint(format!("port {} is out of range", parsed))
            })?,
        };

        Ok(Self::new(host, port))
    }

    /// WebSocket URL for this endpoint
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Credentials sent in the first frame after open
///
/// Blank fields are replaced by the device's factory defaults
/// (`admin` / `123456`). This is a convenience fallback, not a security
/// feature: the frame always travels in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Resolve credential fields, substituting defaults for empty ones
    pub fn resolve(username: &str, password: &str) -> Self {
        let pick = |value: &str, default: &str| {
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            username: pick(username, DEFAULT_USERNAME),
            password: pick(password, DEFAULT_PASSWORD),
        }
    }

    /// The `{username}:{password}` frame
    pub fn frame(&self) -> String {
        credential_frame(&self.username, &self.password)
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::resolve("", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_host_uses_fallback() {
        let endpoint = Endpoint::resolve("", "9000", "raspberrypi.local").unwrap();
        assert_eq!(endpoint.url(), "ws://raspberrypi.local:9000");

        let endpoint = Endpoint::resolve("   ", "9000", "localhost").unwrap();
        assert_eq!(endpoint.host, "localhost");
    }

    #[test]
    fn test_blank_or_bad_port_uses_default() {
        for port in ["", "  ", "abc", "0"] {
            let endpoint = Endpoint::resolve("10.0.0.2", port, "localhost").unwrap();
            assert_eq!(endpoint.port, DEFAULT_PORT, "port input {:?}", port);
        }
    }

    #[test]
    fn test_port_leading_digits() {
        let endpoint = Endpoint::resolve("localhost", "8080abc", "x").unwrap();
        assert_eq!(endpoint.port, 8080);
    }

    #[test]
    fn test_port_out_of_range() {
        assert!(matches!(
            Endpoint::resolve("localhost", "70000", "x"),
            Err(ClientError::InvalidEndpoint(_))
        ));
        assert!(Endpoint::resolve("localhost", "-1", "x").is_err());
    }

    #[test]
    fn test_missing_host_and_fallback() {
        assert!(Endpoint::resolve("", "8888", "").is_err());
    }

    #[test]
    fn test_blank_credentials_use_defaults() {
        let credentials = Credentials::resolve("", "");
        assert_eq!(credentials.frame(), "admin:123456");

        let credentials = Credentials::resolve("pilot", "");
        assert_eq!(credentials.frame(), "pilot:123456");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
    }
}
