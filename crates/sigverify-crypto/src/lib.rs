//! Certificate chain validation and streaming verification of detached signatures.
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod diagnostics;
pub mod error;
pub mod key;
mod pem_file;
pub mod revocation;
pub mod runtime;
pub mod trust_store;
pub mod validator;
pub mod verifier;

