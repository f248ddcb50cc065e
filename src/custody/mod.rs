//! Protected custody of signing key material
//!
//! Key bytes handed to the gateway are sealed immediately and only ever
//! decrypted into a short-lived, zeroizing guard.
//!
//! # Security
//!
//! - Sealed form is ChaCha20-Poly1305 ciphertext under a per-seal random key
//! - The sealing key is stored as two XOR shares, never whole
//! - Plaintext lives only inside `RevealedKey`, wiped on drop
//! - Everything is zeroized when a `SealedKey` is dropped

pub mod crypto;
pub mod sealed;

pub use crypto::{generate_random_bytes, NONCE_LEN};
pub use sealed::{CustodyError, RevealedKey, SealedKey};
