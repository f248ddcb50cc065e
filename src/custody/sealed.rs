//! Sealed key material with scoped reveal.
//!
//! A `SealedKey` keeps the secret only as ChaCha20-Poly1305 ciphertext. The
//! sealing key is never stored whole: it is split into two random-looking
//! shares that are XOR-combined on the stack only for the duration of a
//! reveal. Plaintext is reachable exclusively through a `RevealedKey` guard,
//! which wipes its buffer when dropped.

use std::fmt;
use std::ops::Deref;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::crypto::{generate_random_bytes, open_bytes, seal_bytes, NONCE_LEN, SEALING_KEY_LEN};

/// Errors from sealing or revealing key material
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("Refusing to seal empty key material")]
    Empty,

    #[error("Failed to seal key material: {0}")]
    Seal(String),

    #[error("Failed to open sealed key material")]
    Open,
}

/// Sealing key held as two XOR shares.
#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyShares {
    left: [u8; SEALING_KEY_LEN],
    right: [u8; SEALING_KEY_LEN],
}

impl KeyShares {
    fn split(key: &[u8; SEALING_KEY_LEN]) -> Self {
        let left: [u8; SEALING_KEY_LEN] = generate_random_bytes();
        let mut right = [0u8; SEALING_KEY_LEN];
        for (i, byte) in right.iter_mut().enumerate() {
            *byte = key[i] ^ left[i];
        }
        Self { left, right }
    }

    fn combine(&self) -> Zeroizing<[u8; SEALING_KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; SEALING_KEY_LEN]);
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = self.left[i] ^ self.right[i];
        }
        key
    }
}

/// Secret key material encrypted at rest.
///
/// Owned exclusively by whoever sealed it; not `Clone`. Dropping it zeroizes
/// the ciphertext, nonce and key shares.
#[derive(ZeroizeOnDrop)]
pub struct SealedKey {
    ciphertext: Vec<u8>,
    nonce: [u8; NONCE_LEN],
    shares: KeyShares,
}

impl SealedKey {
    /// Seal a copy of `plaintext`.
    ///
    /// No plaintext copy is retained; `plaintext` itself remains the caller's
    /// to erase.
    pub fn seal(plaintext: &[u8]) -> Result<Self, CustodyError> {
        if plaintext.is_empty() {
            return Err(CustodyError::Empty);
        }

        let sealing_key = Zeroizing::new(generate_random_bytes::<SEALING_KEY_LEN>());
        let nonce: [u8; NONCE_LEN] = generate_random_bytes();
        let ciphertext = seal_bytes(plaintext, &sealing_key, &nonce)?;

        Ok(Self {
            ciphertext,
            nonce,
            shares: KeyShares::split(&sealing_key),
        })
    }

    /// Decrypt into a scoped guard.
    ///
    /// The returned guard must be dropped as soon as the plaintext has been
    /// used; its buffer is wiped on drop, including during unwinding.
    pub fn reveal(&self) -> Result<RevealedKey, CustodyError> {
        let sealing_key = self.shares.combine();
        let plaintext = open_bytes(&self.ciphertext, &sealing_key, &self.nonce)?;
        Ok(RevealedKey { bytes: plaintext })
    }

    /// Length of the sealed plaintext in bytes.
    pub fn len(&self) -> usize {
        self.ciphertext.len().saturating_sub(super::crypto::AUTH_TAG_LEN)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SealedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedKey")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Momentarily revealed plaintext; zeroized on drop.
pub struct RevealedKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl RevealedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Deref for RevealedKey {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for RevealedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RevealedKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_reveal() {
        let secret = [0x42u8; 32];
        let sealed = SealedKey::seal(&secret).unwrap();
        assert_eq!(sealed.len(), 32);

        let revealed = sealed.reveal().unwrap();
        assert_eq!(revealed.as_bytes(), &secret[..]);
    }

    #[test]
    fn test_reveal_is_repeatable() {
        let sealed = SealedKey::seal(b"key-material").unwrap();
        let first = sealed.reveal().unwrap().to_vec();
        let second = sealed.reveal().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sealed_form_hides_plaintext() {
        let secret = [0x11u8; 32];
        let sealed = SealedKey::seal(&secret).unwrap();

        assert!(!sealed
            .ciphertext
            .windows(secret.len())
            .any(|w| w == secret));
        assert_ne!(sealed.shares.left, sealed.shares.right);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(SealedKey::seal(&[]), Err(CustodyError::Empty)));
    }

    #[test]
    fn test_debug_redacts() {
        let sealed = SealedKey::seal(&[9u8; 32]).unwrap();
        let revealed = sealed.reveal().unwrap();
        assert!(!format!("{:?}", revealed).contains('9'));
        assert!(format!("{:?}", sealed).contains("len: 32"));
    }
}
