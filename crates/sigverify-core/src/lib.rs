//! Core types shared across the sigverify crates.
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod config;
pub mod paths;
pub mod request;
