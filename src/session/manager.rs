//! Session key custody
//!
//! Holds at most one signing session: a sealed key, its expiry, and the
//! cumulative value it has authorized. Every public operation checks expiry
//! on entry and tears an expired session down before doing anything else.
//!
//! # Locking
//!
//! The session lives behind a single `RwLock`. `status` reads; `activate`,
//! `sign` and `destroy` write. `sign` keeps the write lock across limit
//! check, signature and commit, so two signs can never both pass the check
//! against the same `value_used`.

use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigUint;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::custody::SealedKey;
use crate::signing::{Signature, SigningPrimitive};

use super::error::SessionError;

/// Live custody of one key plus its spend counters
struct ActiveSession {
    key: SealedKey,
    address: String,
    expires_at: Instant,
    max_value_limit: BigUint,
    value_used: BigUint,
}

impl ActiveSession {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn remaining(&self) -> BigUint {
        if self.value_used >= self.max_value_limit {
            BigUint::default()
        } else {
            &self.max_value_limit - &self.value_used
        }
    }

    fn snapshot(&self, now: Instant) -> SessionStatus {
        SessionStatus {
            active: true,
            ttl_remaining: self.expires_at.saturating_duration_since(now),
            max_value_limit: self.max_value_limit.to_string(),
            value_used: self.value_used.to_string(),
            address: self.address.clone(),
        }
    }
}

/// Read-only report of the session.
///
/// Monetary fields are exact decimal-integer text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub active: bool,
    pub ttl_remaining: Duration,
    pub max_value_limit: String,
    pub value_used: String,
    pub address: String,
}

impl SessionStatus {
    /// Shape reported whenever no valid session exists
    pub fn inactive() -> Self {
        Self {
            active: false,
            ttl_remaining: Duration::ZERO,
            max_value_limit: "0".to_string(),
            value_used: "0".to_string(),
            address: String::new(),
        }
    }

    /// Whole seconds left, rounded down
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_remaining.as_secs()
    }
}

/// Outcome of `destroy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// No session was held
    Empty,
    /// A live session was discarded
    Destroyed,
    /// The held session had already expired
    Expired,
}

/// Result of a successful `sign`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSignature {
    pub signature: Signature,
    /// Address of the session that produced the signature
    pub address: String,
    /// Cumulative value after this signature was committed
    pub value_used: BigUint,
}

/// Session custody manager.
///
/// Cheap to share behind an `Arc`; all interior state is synchronized.
pub struct SessionManager {
    session: RwLock<Option<ActiveSession>>,
    ttl: Duration,
    signer: Arc<dyn SigningPrimitive>,
}

impl SessionManager {
    /// Create a manager with no active session.
    pub fn new(ttl: Duration, signer: Arc<dyn SigningPrimitive>) -> Self {
        Self {
            session: RwLock::new(None),
            ttl,
            signer,
        }
    }

    /// Configured session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Seal `key_bytes` and start a fresh session.
    ///
    /// Any prior session is discarded first, even if still valid. If the key
    /// is rejected the manager is left with no session. `key_bytes` stays the
    /// caller's to erase.
    ///
    /// Returns the new session's status, taken before the lock is released.
    pub async fn activate(
        &self,
        key_bytes: &[u8],
        max_value_limit: BigUint,
    ) -> Result<SessionStatus, SessionError> {
        let mut guard = self.session.write().await;

        if guard.take().is_some() {
            info!("Discarding previous session for re-activation");
        }

        let address = self
            .signer
            .derive_address(key_bytes)
            .map_err(SessionError::InvalidKey)?;
        let key = SealedKey::seal(key_bytes)?;

        info!(
            address = %address,
            max_value_limit = %max_value_limit,
            ttl_secs = self.ttl.as_secs(),
            "Session activated"
        );

        let now = Instant::now();
        let session = ActiveSession {
            key,
            address,
            expires_at: now + self.ttl,
            max_value_limit,
            value_used: BigUint::default(),
        };
        let status = session.snapshot(now);
        *guard = Some(session);

        Ok(status)
    }

    /// Authorize and sign `digest` against `order_value` of budget.
    ///
    /// Spend is committed only after the signing primitive succeeds; any
    /// failure leaves `value_used` untouched. The revealed key is wiped before
    /// this returns on every path.
    ///
    /// Besides the session and limit errors, a sealed key that fails to open
    /// surfaces as `SessionError::Custody` (`INTERNAL` to callers), distinct from
    /// `SigningFailure`.
    pub async fn sign(
        &self,
        order_value: &BigUint,
        digest: &[u8; 32],
    ) -> Result<SessionSignature, SessionError> {
        let mut guard = self.session.write().await;

        let expired = match guard.as_ref() {
            None => return Err(SessionError::NoActiveSession),
            Some(session) => session.is_expired(Instant::now()),
        };
        if expired {
            Self::teardown(&mut guard, "expired");
            return Err(SessionError::SessionExpired);
        }

        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;

        let candidate = &session.value_used + order_value;
        if candidate > session.max_value_limit {
            let remaining = session.remaining();
            warn!(
                address = %session.address,
                requested = %order_value,
                remaining = %remaining,
                "Rejected order over cumulative value limit"
            );
            return Err(SessionError::ValueLimitExceeded {
                requested: order_value.clone(),
                remaining,
            });
        }

        let signature = {
            let revealed = session.key.reveal()?;
            self.signer.sign_digest(&revealed, digest)
        }
        .map_err(|e| {
            warn!(address = %session.address, error = %e, "Signing primitive failed");
            SessionError::SigningFailure(e)
        })?;

        session.value_used = candidate;
        debug!(
            address = %session.address,
            order_value = %order_value,
            value_used = %session.value_used,
            "Order signed"
        );

        Ok(SessionSignature {
            signature,
            address: session.address.clone(),
            value_used: session.value_used.clone(),
        })
    }

    /// Report the session, tearing it down first if it has expired.
    pub async fn status(&self) -> SessionStatus {
        self.observe().await.0
    }

    /// Like `status`, also reporting whether this call tore down an expired
    /// session.
    pub async fn observe(&self) -> (SessionStatus, bool) {
        {
            let guard = self.session.read().await;
            match guard.as_ref() {
                None => return (SessionStatus::inactive(), false),
                Some(session) => {
                    let now = Instant::now();
                    if !session.is_expired(now) {
                        return (session.snapshot(now), false);
                    }
                }
            }
        }

        // Expired under the read lock: upgrade and re-check, a writer may
        // have replaced the session in between.
        let mut guard = self.session.write().await;
        let now = Instant::now();
        let expired = guard.as_ref().is_some_and(|s| s.is_expired(now));
        if expired {
            Self::teardown(&mut guard, "expired");
        }
        let status = guard
            .as_ref()
            .map(|s| s.snapshot(now))
            .unwrap_or_else(SessionStatus::inactive);
        (status, expired)
    }

    /// Discard the session irreversibly. Idempotent.
    ///
    /// Reports what was in the slot when the lock was taken.
    pub async fn destroy(&self) -> Teardown {
        let mut guard = self.session.write().await;
        let found = match guard.as_ref() {
            None => Teardown::Empty,
            Some(s) if s.is_expired(Instant::now()) => Teardown::Expired,
            Some(_) => Teardown::Destroyed,
        };
        Self::teardown(&mut guard, "destroyed");
        found
    }

    /// Whether a non-expired session exists (does not tear down).
    pub async fn is_active(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| !s.is_expired(Instant::now()))
    }

    fn teardown(slot: &mut Option<ActiveSession>, reason: &str) {
        // Dropping the session zeroizes the sealed key
        if let Some(session) = slot.take() {
            info!(address = %session.address, reason, "Session torn down");
        }
    }
}
