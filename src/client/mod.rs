//! Device client module
//!
//! Connection lifecycle, credential handshake and command dispatch for a
//! single device socket.

#[allow(dead_code)]
mod activity;
mod dispatcher;
mod error;
#[allow(dead_code)]
mod manager;
#[allow(dead_code)]
mod state;
mod transport;

pub use activity::*;
pub use dispatcher::*;
pub use error::*;
pub use manager::*;
pub use state::*;
pub use transport::*;
