//! Protocol definitions
//!
//! Defines the text frames exchanged between the console and a Rasptank device.
//! Outbound frames are plain text; inbound frames are arbitrary text that may
//! carry a JSON status envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Port the device listens on when none is given
pub const DEFAULT_PORT: u16 = 8888;

/// Username sent when the operator leaves the field blank
pub const DEFAULT_USERNAME: &str = "admin";

/// Password sent when the operator leaves the field blank
pub const DEFAULT_PASSWORD: &str = "123456";

/// Verb that asks the device for its system information
pub const INFO_TITLE: &str = "get_info";

/// Verb of the single parameterized command (set speed)
pub const SET_SPEED_VERB: &str = "wsB";

// ============================================================================
// Error Types
// ============================================================================

/// Protocol-related errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ============================================================================
// Outbound Frames
// ============================================================================

/// Build the credential frame sent as the first message after open
pub fn credential_frame(username: &str, password: &str) -> String {
    format!("{}:{}", username, password)
}

/// A command sent from the console to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// A bare verb such as `get_info` or `forward`
    Verb(String),
    /// A verb with a single integer argument such as `wsB 42`
    WithArgument { verb: String, value: i64 },
}

impl OutboundCommand {
    /// Create a bare verb command
    pub fn verb(verb: impl Into<String>) -> Self {
        Self::Verb(verb.into())
    }

    /// Create a verb command carrying one integer argument
    pub fn with_argument(verb: impl Into<String>, value: i64) -> Self {
        Self::WithArgument {
            verb: verb.into(),
            value,
        }
    }

    /// Render the command as the text frame written to the socket
    pub fn to_frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verb(verb) => write!(f, "{}", verb),
            Self::WithArgument { verb, value } => write!(f, "{} {}", verb, value),
        }
    }
}

/// Coerce operator input to an integer the way the device UI always has:
/// leading whitespace and an optional sign, then base-10 digits up to the
/// first non-digit. Anything unparsable becomes 0.
pub fn coerce_integer(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => 0,
    }
}

// ============================================================================
// Inbound Frames
// ============================================================================

/// Classification of a frame received from the device
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Opaque text, shown in the activity log only
    LogLine(String),
    /// A `get_info` status object that replaces the displayed snapshot
    InfoSnapshot(Value),
}

impl InboundMessage {
    /// Whether this message carries an info snapshot
    pub fn is_info_snapshot(&self) -> bool {
        matches!(self, Self::InfoSnapshot(_))
    }
}

/// Classify an inbound text frame.
///
/// A frame is an info snapshot only when it parses as a JSON object with a
/// `status` key and a `title` equal to `get_info`, either at the top level or
/// nested under `data`. Everything else, including text that is not JSON at
/// all, is a log line.
pub fn classify(text: &str) -> InboundMessage {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if is_info_shape(&value) => InboundMessage::InfoSnapshot(value),
        _ => InboundMessage::LogLine(text.to_string()),
    }
}

fn is_info_shape(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    if !object.contains_key("status") {
        return false;
    }

    let titled = |candidate: Option<&Value>| candidate.and_then(Value::as_str) == Some(INFO_TITLE);
    titled(object.get("title")) || titled(object.get("data").and_then(|data| data.get("title")))
}

// ============================================================================
// Device Responses
// ============================================================================

/// Outcome flag carried by every device response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Nok,
}

/// Status envelope the device answers each command with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceResponse {
    pub status: ResponseStatus,
    pub title: String,
    pub data: Value,
}

impl DeviceResponse {
    /// Create a success response
    pub fn success(title: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            status: ResponseStatus::Ok,
            title: title.into(),
            data: data.into(),
        }
    }

    /// Create a failure response
    pub fn failed(title: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            status: ResponseStatus::Nok,
            title: title.into(),
            data: data.into(),
        }
    }

    /// Serialize the response to JSON
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a response from JSON
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
