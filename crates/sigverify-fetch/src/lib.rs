//! Retrieval of remote signature artifacts onto the local filesystem.
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod error;
pub mod fetcher;
