//! Shared types for the signer gateway

pub mod error;

pub use error::{Result, SignerError};
