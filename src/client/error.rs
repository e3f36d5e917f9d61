//! Client error taxonomy
//!
//! None of these are returned to callers of `connect` or the send operations;
//! they are rendered into the activity log instead.

use thiserror::Error;

/// Errors that can occur while driving the device connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    #[error("No async runtime available to open the socket")]
    NoRuntime,

    #[error("WebSocket error: {0}")]
    Transport(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
