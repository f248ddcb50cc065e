//! Signing primitive used by the session core.
//!
//! The core only ever sees the `SigningPrimitive` trait: given momentarily
//! revealed key bytes it derives a display address or signs a 32-byte digest.
//! `Secp256k1Signer` is the production implementation (EVM-compatible
//! recoverable ECDSA).

use std::fmt;

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha3::{Digest, Keccak256};

/// Signature length: r (32) ‖ s (32) ‖ v (1)
pub const SIGNATURE_LEN: usize = 65;

/// secp256k1 private key length
pub const PRIVATE_KEY_LEN: usize = 32;

/// Errors from the signing primitive
#[derive(Debug, Clone, thiserror::Error)]
pub enum SigningError {
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Signature generation failed: {0}")]
    Backend(String),
}

/// Fixed-length recoverable signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

/// External signing primitive contract.
///
/// Implementations must be synchronous, side-effect free and must not retain
/// the key bytes they are given.
pub trait SigningPrimitive: Send + Sync {
    /// Derive a stable display identifier for `key`.
    fn derive_address(&self, key: &[u8]) -> Result<String, SigningError>;

    /// Sign a pre-computed 32-byte digest with `key`.
    fn sign_digest(&self, key: &[u8], digest: &[u8; 32]) -> Result<Signature, SigningError>;
}

/// secp256k1 ECDSA signer producing `r ‖ s ‖ v` signatures with `v ∈ {27, 28}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Signer;

impl Secp256k1Signer {
    pub fn new() -> Self {
        Self
    }

    fn signing_key(key: &[u8]) -> Result<SigningKey, SigningError> {
        if key.len() != PRIVATE_KEY_LEN {
            return Err(SigningError::InvalidKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LEN,
                key.len()
            )));
        }
        SigningKey::from_slice(key)
            .map_err(|_| SigningError::InvalidKey("not a valid secp256k1 scalar".into()))
    }
}

impl SigningPrimitive for Secp256k1Signer {
    fn derive_address(&self, key: &[u8]) -> Result<String, SigningError> {
        let signing_key = Self::signing_key(key)?;
        let public_key = PublicKey::from(signing_key.verifying_key());
        Ok(evm_address(&public_key))
    }

    fn sign_digest(&self, key: &[u8], digest: &[u8; 32]) -> Result<Signature, SigningError> {
        let signing_key = Self::signing_key(key)?;
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SigningError::Backend(e.to_string()))?;

        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;
        Ok(Signature::from_bytes(bytes))
    }
}

/// EIP-55 checksummed address of a secp256k1 public key.
pub fn evm_address(public_key: &PublicKey) -> String {
    let encoded = public_key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag
    let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
    to_checksum_address(&hash[12..])
}

/// Render 20 address bytes with the EIP-55 mixed-case checksum.
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
