//! Configuration module
//!
//! Loads the console's connection settings from a TOML file.

#[allow(dead_code)]
mod client;

pub use client::*;
