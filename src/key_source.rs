//! Key sources
//!
//! Where raw key bytes come from before they are sealed into a session. Every
//! source hands back a zeroizing buffer and wipes any intermediate text it
//! produced along the way.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::custody::{CustodyError, SealedKey};

/// Errors loading key material
#[derive(Debug, thiserror::Error)]
pub enum KeySourceError {
    #[error("Failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Key material is not valid hex")]
    InvalidHex,

    #[error("Key material is empty")]
    Empty,

    #[error(transparent)]
    Custody(#[from] CustodyError),
}

/// Supplier of raw signing key bytes
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Load the key. The caller seals it and drops the buffer.
    async fn load(&self) -> Result<Zeroizing<Vec<u8>>, KeySourceError>;

    /// Human-readable description for logs (never the key itself)
    fn describe(&self) -> String;
}

/// Decode hex key text, tolerating a `0x` prefix and surrounding whitespace.
pub fn decode_hex_key(text: &str) -> Result<Zeroizing<Vec<u8>>, KeySourceError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(KeySourceError::Empty);
    }

    hex::decode(digits)
        .map(Zeroizing::new)
        .map_err(|_| KeySourceError::InvalidHex)
}

/// Reads a hex-encoded key from a file on every `load`
#[derive(Debug, Clone)]
pub struct HexFileKeySource {
    path: PathBuf,
}

impl HexFileKeySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KeySource for HexFileKeySource {
    async fn load(&self) -> Result<Zeroizing<Vec<u8>>, KeySourceError> {
        let mut text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| KeySourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let decoded = decode_hex_key(&text);
        text.zeroize();

        debug!(path = %self.path.display(), "Loaded key from file");
        decoded
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Hex-encoded key taken from an environment variable.
///
/// The variable is read and removed once, in `consume`, and the key is kept
/// sealed for later activations.
///
/// `consume` mutates the process environment: call it while the process is
/// still single-threaded, before the async runtime starts its workers.
#[derive(Debug)]
pub struct EnvKeySource {
    var: String,
    sealed: SealedKey,
}

impl EnvKeySource {
    /// Read, decode and seal the key held in `var`, then unset `var`.
    pub fn consume(var: impl Into<String>) -> Result<Self, KeySourceError> {
        let var = var.into();
        let mut text =
            std::env::var(&var).map_err(|_| KeySourceError::MissingEnv(var.clone()))?;
        std::env::remove_var(&var);

        let decoded = decode_hex_key(&text);
        text.zeroize();
        let sealed = SealedKey::seal(&decoded?)?;

        warn!(var = %var, "Key consumed from environment; variable removed");
        Ok(Self { var, sealed })
    }
}

#[async_trait]
impl KeySource for EnvKeySource {
    async fn load(&self) -> Result<Zeroizing<Vec<u8>>, KeySourceError> {
        let revealed = self.sealed.reveal()?;
        Ok(Zeroizing::new(revealed.to_vec()))
    }

    fn describe(&self) -> String {
        format!("env:{}", self.var)
    }
}
