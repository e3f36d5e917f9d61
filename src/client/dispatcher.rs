//! Command dispatcher
//!
//! Formats outbound commands and writes them through the connection manager,
//! but only while the manager reports a live connection. Every send is
//! fire-and-forget: nothing is queued, retried or acknowledged.

use super::{ClientError, ConnectionManager, LogLevel};
use crate::protocol::{coerce_integer, OutboundCommand, INFO_TITLE, SET_SPEED_VERB};

/// Sends commands over a borrowed connection manager
pub struct CommandDispatcher<'a> {
    manager: &'a mut ConnectionManager,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(manager: &'a mut ConnectionManager) -> Self {
        Self { manager }
    }

    /// Send a bare verb.
    ///
    /// Returns whether the transport accepted the frame. When not connected a
    /// single "Not connected" error is logged and nothing is written.
    pub fn send_command(&mut self, verb: &str) -> bool {
        self.dispatch(OutboundCommand::verb(verb))
    }

    /// Send a verb followed by one integer argument
    pub fn send_command_with_argument(&mut self, verb: &str, value: i64) -> bool {
        self.dispatch(OutboundCommand::with_argument(verb, value))
    }

    /// Send a verb with an argument typed by the operator; unparsable input becomes 0
    pub fn send_command_with_raw_argument(&mut self, verb: &str, raw_value: &str) -> bool {
        self.send_command_with_argument(verb, coerce_integer(raw_value))
    }

    /// Ask the device for its system information
    pub fn get_info(&mut self) -> bool {
        self.send_command(INFO_TITLE)
    }

    /// Set the drive speed
    pub fn set_speed(&mut self, value: i64) -> bool {
        self.send_command_with_argument(SET_SPEED_VERB, value)
    }

    fn dispatch(&mut self, command: OutboundCommand) -> bool {
        if !self.manager.is_connected() {
            self.manager.record(LogLevel::Error, ClientError::NotConnected.to_string());
            return false;
        }

        let frame = command.to_frame();
        self.manager.record(LogLevel::Info, format!("→ {}", frame));
        match self.manager.send_frame(frame) {
            Ok(()) => true,
            Err(e) => {
                self.manager.record(LogLevel::Error, e.to_string());
                false
            }
        }
    }
}
