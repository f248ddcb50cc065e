//! Cryptographic primitives for sealing key material at rest.
//!
//! # Algorithms
//!
//! - **Encryption**: ChaCha20-Poly1305 (authenticated encryption)
//! - **Sealing key**: 256-bit random key generated per seal, never reused
//! - **Nonce**: 96-bit random nonce generated per seal

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::sealed::CustodyError;

// =============================================================================
// Constants
// =============================================================================

/// Sealing key length (32 bytes)
pub const SEALING_KEY_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

// =============================================================================
// Randomness
// =============================================================================

/// Generate cryptographically secure random bytes.
///
/// # Type Parameters
///
/// - `N`: The number of bytes to generate
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

// =============================================================================
// Encryption / Decryption
// =============================================================================

/// Encrypt secret bytes using ChaCha20-Poly1305.
///
/// Returns ciphertext (`plaintext.len() + AUTH_TAG_LEN` bytes).
/// The nonce must never be reused with the same sealing key.
pub fn seal_bytes(
    plaintext: &[u8],
    sealing_key: &[u8; SEALING_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>, CustodyError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(sealing_key));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CustodyError::Seal(e.to_string()))
}

/// Decrypt sealed bytes using ChaCha20-Poly1305.
///
/// The plaintext is handed back inside a zeroizing buffer so it is wiped
/// whenever the caller lets go of it.
///
/// # Errors
///
/// Returns `CustodyError::Open` if the auth tag does not verify (tampered
/// ciphertext or wrong sealing key).
pub fn open_bytes(
    ciphertext: &[u8],
    sealing_key: &[u8; SEALING_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Zeroizing<Vec<u8>>, CustodyError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(sealing_key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CustodyError::Open)
}

// =============================================================================
// Tests
// =============================================================================
