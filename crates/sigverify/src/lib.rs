//! sigverify: trust verification of downloaded update artifacts.
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod commands;
/// CLI configuration, read from `~/.sigverify/config.toml` or the environment.
pub mod config;
pub mod session;
