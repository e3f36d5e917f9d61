//! Mock device module
//!
//! Emulates the device side of the protocol for local testing without
//! hardware.

mod commands;
mod server;

pub use commands::*;
pub use server::*;
