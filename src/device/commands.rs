//! Device command table
//!
//! The verbs a Rasptank understands and how the mock device answers them.

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::protocol::{DeviceResponse, SET_SPEED_VERB};

/// Zero-argument commands: drive, arm/hand/wrist/claw/camera servos, info
pub const SUPPORTED_COMMANDS: &[&str] = &[
    "forward", "backward", "left", "right", "DS", "TS", "armUp", "armDown", "armStop", "handUp",
    "handDown", "handStop", "lookleft", "lookright", "LRstop", "grab", "loose", "GLstop", "up",
    "down", "UDstop", "home", "get_info",
];

/// Commands that take exactly one integer argument
pub const ARG_COMMANDS: &[&str] = &[SET_SPEED_VERB];

/// Reasons a command frame is refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command {0} Not Supported")]
    NotSupported(String),

    #[error("Command {0} Need 1 argument")]
    MissingArgument(String),

    #[error("Command Not Supported: {0}")]
    NotText(String),
}

impl CommandError {
    /// Title echoed back in the failure response
    fn title(&self) -> &str {
        match self {
            Self::NotSupported(verb) | Self::MissingArgument(verb) => verb,
            Self::NotText(_) => "unknown",
        }
    }
}

impl From<CommandError> for DeviceResponse {
    fn from(err: CommandError) -> Self {
        DeviceResponse::failed(err.title().to_string(), err.to_string())
    }
}

/// A command the device accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Control(String),
    ControlWithArgument { verb: String, value: i64 },
}

impl DeviceCommand {
    /// Parse a command frame.
    ///
    /// Returns `Ok(None)` for frames the device silently skips (blank text or
    /// JSON `null`). A frame that is a JSON string is unwrapped first; any
    /// other JSON value is refused.
    pub fn from_frame(frame: &str) -> Result<Option<Self>, CommandError> {
        let text = match serde_json::from_str::<Value>(frame) {
            Ok(Value::Null) => return Ok(None),
            Ok(Value::String(text)) => text,
            Ok(other) => return Err(CommandError::NotText(other.to_string())),
            Err(_) => frame.to_string(),
        };

        let mut parts = text.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let value = parts.next().and_then(|raw| raw.parse::<i64>().ok());

        if SUPPORTED_COMMANDS.contains(&verb) {
            return Ok(Some(Self::Control(verb.to_string())));
        }
        if ARG_COMMANDS.contains(&verb) {
            return match value {
                Some(value) => Ok(Some(Self::ControlWithArgument {
                    verb: verb.to_string(),
                    value,
                })),
                None => Err(CommandError::MissingArgument(verb.to_string())),
            };
        }
        Err(CommandError::NotSupported(verb.to_string()))
    }

    pub fn verb(&self) -> &str {
        match self {
            Self::Control(verb) | Self::ControlWithArgument { verb, .. } => verb,
        }
    }

    /// Carry out the command and build the success response
    pub fn execute(&self) -> DeviceResponse {
        match self {
            Self::Control(verb) => info!("Executed: {}", verb),
            Self::ControlWithArgument { verb, value } => info!("Executed: {}, {}", verb, value),
        }
        let verb = self.verb();
        DeviceResponse::success(verb, format!("Command {} Executed", verb))
    }
}

/// Answer a single command frame; `None` means the frame is ignored
pub fn respond(frame: &str) -> Option<DeviceResponse> {
    match DeviceCommand::from_frame(frame) {
        Ok(Some(command)) => Some(command.execute()),
        Ok(None) => None,
        Err(e) => Some(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{classify, ResponseStatus};

    #[test]
    fn test_success_no_arg() {
        let response = respond("forward").unwrap();
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.title, "forward");
        assert_eq!(response.data, "Command forward Executed");
    }

    #[test]
    fn test_success_with_arg() {
        let response = respond("wsB 42").unwrap();
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.title, "wsB");
    }

    #[test]
    fn test_missing_arg() {
        let response = respond("wsB").unwrap();
        assert_eq!(response.status, ResponseStatus::Nok);
        assert_eq!(response.data, "Command wsB Need 1 argument");

        let response = respond("wsB fast").unwrap();
        assert_eq!(response.status, ResponseStatus::Nok);
    }

    #[test]
    fn test_unsupported() {
        let response = respond("jump").unwrap();
        assert_eq!(response.status, ResponseStatus::Nok);
        assert_eq!(response.title, "jump");
        assert!(response.data.as_str().unwrap().contains("Not Supported"));
    }

    #[test]
    fn test_json_string_frame_unwrapped() {
        assert_eq!(
            DeviceCommand::from_frame(r#""home""#).unwrap(),
            Some(DeviceCommand::Control("home".to_string()))
        );
    }

    #[test]
    fn test_non_text_json_refused() {
        let response = respond("[1, 2]").unwrap();
        assert_eq!(response.status, ResponseStatus::Nok);
        assert_eq!(response.title, "unknown");
    }

    #[test]
    fn test_blank_and_null_frames_skipped() {
        assert!(respond("").is_none());
        assert!(respond("   ").is_none());
        assert!(respond("null").is_none());
    }

    #[test]
    fn test_get_info_response_is_info_snapshot() {
        let json = respond("get_info").unwrap().to_json().unwrap();
        assert!(classify(&json).is_info_snapshot());
    }
}
