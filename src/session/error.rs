//! Session core errors

use num_bigint::BigUint;

use crate::custody::CustodyError;
use crate::signing::SigningError;

/// Failures of session custody operations.
///
/// All are terminal for the current call; none are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Nothing activated, or already torn down
    #[error("no active session")]
    NoActiveSession,

    /// TTL elapsed; the session was torn down when this was detected
    #[error("session expired")]
    SessionExpired,

    /// Request would push cumulative value past the ceiling; nothing changed
    #[error("cumulative value limit exceeded: requested {requested}, remaining {remaining}")]
    ValueLimitExceeded {
        requested: BigUint,
        remaining: BigUint,
    },

    /// Signing primitive failed; spend was not committed
    #[error("signing failed: {0}")]
    SigningFailure(#[source] SigningError),

    /// Key rejected at activation
    #[error("invalid key material: {0}")]
    InvalidKey(#[source] SigningError),

    #[error(transparent)]
    Custody(#[from] CustodyError),
}
