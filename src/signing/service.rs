//! Signing Service
//!
//! Authorization facade in front of the session core. Validates incoming
//! orders, hashes them, asks the core for a signature against the order's
//! value, and shapes responses. Holds no secret state of its own.

use std::sync::Arc;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::key_source::KeySource;
use crate::logging::{AuditEventType, AuditLogger};
use crate::session::{SessionError, SessionManager, SessionStatus, Teardown};
use crate::types::{Result, SignerError};

use super::eip712::{typed_data_digest, Eip712Domain};
use super::order::OrderRequest;

/// Signing service configuration
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Typed-data domain every order is hashed under
    pub domain: Eip712Domain,

    /// Ceiling used when an activation does not name one
    pub default_max_value_limit: BigUint,
}

/// Request to sign an order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignOrderRequest {
    #[serde(default)]
    pub order: Option<OrderRequest>,
}

/// Successful signing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOrderResponse {
    /// `0x`-prefixed 65-byte signature
    pub signature: String,
    /// Session address that produced the signature
    pub signer_address: String,
}

/// Session report as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub active: bool,
    pub ttl_seconds: u64,
    pub max_value_limit: String,
    pub value_used: String,
    pub session_address: String,
}

/// The signing service
pub struct SigningService {
    config: SigningConfig,
    sessions: Arc<SessionManager>,
    audit: AuditLogger,
}

impl SigningService {
    pub fn new(config: SigningConfig, sessions: Arc<SessionManager>, audit: AuditLogger) -> Self {
        Self {
            config,
            sessions,
            audit,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Validate, hash and sign an order.
    ///
    /// Input is fully checked before the session is touched, so malformed
    /// requests never consume budget or trigger expiry teardown.
    pub async fn sign_order(&self, request: SignOrderRequest) -> Result<SignOrderResponse> {
        let order_request = request
            .order
            .ok_or_else(|| SignerError::InvalidInput("order is required".to_string()))?;

        let order = order_request.parse()?;
        let digest = typed_data_digest(&self.config.domain, &order)
            .map_err(|e| SignerError::InvalidInput(e.to_string()))?;

        match self.sessions.sign(&order.maker_amount, &digest).await {
            Ok(signed) => {
                debug!(
                    address = %signed.address,
                    order_value = %order.maker_amount,
                    "Order authorized"
                );
                self.audit
                    .log(
                        self.audit
                            .event(AuditEventType::OrderSigned)
                            .with_address(signed.address.clone())
                            .with_order_value(&order.maker_amount)
                            .with_value_used(&signed.value_used),
                    )
                    .await;

                Ok(SignOrderResponse {
                    signature: signed.signature.to_hex(),
                    signer_address: signed.address,
                })
            }
            Err(err) => {
                let event_type = match err {
                    SessionError::SessionExpired => AuditEventType::SessionExpired,
                    _ => AuditEventType::SignRejected,
                };
                let mapped = SignerError::from(err);
                warn!(code = mapped.code(), order_value = %order.maker_amount, "Sign rejected");
                self.audit
                    .log(
                        self.audit
                            .event(event_type)
                            .with_order_value(&order.maker_amount)
                            .with_reason(mapped.code()),
                    )
                    .await;
                Err(mapped)
            }
        }
    }

    /// Current session report. Never fails.
    ///
    /// An expired session torn down by this call is recorded in the audit
    /// trail.
    pub async fn session_status(&self) -> SessionStatusResponse {
        let (status, expired) = self.sessions.observe().await;
        if expired {
            self.audit
                .log(
                    self.audit
                        .event(AuditEventType::SessionExpired)
                        .with_reason("status_check"),
                )
                .await;
        }
        status.into()
    }

    /// Load a key from `source` and start a new session.
    ///
    /// `max_value_limit` falls back to the configured default.
    pub async fn activate_from(
        &self,
        source: &dyn KeySource,
        max_value_limit: Option<BigUint>,
    ) -> Result<SessionStatusResponse> {
        let limit = max_value_limit.unwrap_or_else(|| self.config.default_max_value_limit.clone());

        let key = source.load().await?;
        // Status comes from the activation's own critical section, never a
        // later read another writer could have overtaken
        let status = SessionStatusResponse::from(self.sessions.activate(&key, limit.clone()).await?);
        drop(key);

        info!(
            source = %source.describe(),
            address = %status.session_address,
            ttl_secs = self.sessions.ttl().as_secs(),
            "Session activated from key source"
        );
        self.audit
            .log(
                self.audit
                    .event(AuditEventType::SessionActivated)
                    .with_address(status.session_address.clone())
                    .with_max_value_limit(&limit),
            )
            .await;

        Ok(status)
    }

    /// Tear the session down.
    pub async fn destroy(&self) -> Teardown {
        let outcome = self.sessions.destroy().await;
        let event_type = match outcome {
            Teardown::Empty => return outcome,
            Teardown::Destroyed => AuditEventType::SessionDestroyed,
            Teardown::Expired => AuditEventType::SessionExpired,
        };
        self.audit.log(self.audit.event(event_type)).await;
        outcome
    }
}

impl From<SessionStatus> for SessionStatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            active: status.active,
            ttl_seconds: status.ttl_seconds(),
            max_value_limit: status.max_value_limit,
            value_used: status.value_used,
            session_address: status.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_source::KeySourceError;
    use crate::signing::order::parse_address;
    use crate::signing::Secp256k1Signer;
    use async_trait::async_trait;
    use std::time::Duration;
    use zeroize::Zeroizing;

    struct StaticKey(Vec<u8>);

    #[async_trait]
    impl KeySource for StaticKey {
        async fn load(&self) -> std::result::Result<Zeroizing<Vec<u8>>, KeySourceError> {
            Ok(Zeroizing::new(self.0.clone()))
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    fn service() -> SigningService {
        let domain = Eip712Domain {
            name: "Test Exchange".to_string(),
            version: "1".to_string(),
            chain_id: 137,
            verifying_contract: parse_address("exchange", "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E")
                .unwrap(),
        };
        let sessions = Arc::new(SessionManager::new(
            Duration::from_secs(60),
            Arc::new(Secp256k1Signer::new()),
        ));
        SigningService::new(
            SigningConfig {
                domain,
                default_max_value_limit: BigUint::from(1_000u32),
            },
            sessions,
            AuditLogger::new("test".to_string()),
        )
    }

    fn order(maker_amount: &str) -> SignOrderRequest {
        SignOrderRequest {
            order: Some(
                serde_json::from_value(serde_json::json!({
                    "salt": "1",
                    "maker": "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf",
                    "signer": "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf",
                    "tokenId": "42",
                    "makerAmount": maker_amount,
                    "takerAmount": "10",
                    "side": "SELL"
                }))
                .unwrap(),
            ),
        }
    }

    #[tokio::test]
    async fn test_missing_order_is_invalid_input() {
        let err = service().sign_order(SignOrderRequest::default()).await.unwrap_err();
        assert!(matches!(err, SignerError::InvalidInput(ref m) if m.contains("order is required")));
    }

    #[tokio::test]
    async fn test_activate_uses_default_limit() {
        let service = service();
        let status = service
            .activate_from(&StaticKey(vec![1u8; 32]), None)
            .await
            .unwrap();
        assert!(status.active);
        assert_eq!(status.max_value_limit, "1000");
        assert_eq!(status.value_used, "0");
    }

    #[tokio::test]
    async fn test_sign_returns_session_address() {
        let service = service();
        let status = service
            .activate_from(&StaticKey(vec![1u8; 32]), Some(BigUint::from(50u32)))
            .await
            .unwrap();

        let signed = service.sign_order(order("20")).await.unwrap();
        assert_eq!(signed.signer_address, status.session_address);
        assert_eq!(signed.signature.len(), 2 + 65 * 2);
        assert_eq!(service.session_status().await.value_used, "20");
    }

    #[tokio::test]
    async fn test_bad_key_from_source_is_key_source_error() {
        let service = service();
        let err = service
            .activate_from(&StaticKey(vec![0u8; 31]), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "KEY_SOURCE");
        assert!(!service.session_status().await.active);
    }

    #[tokio::test]
    async fn test_invalid_input_does_not_touch_session() {
        let service = service();
        let err = service.sign_order(order("12.5")).await.unwrap_err();
        // Malformed input wins over the missing session
        assert!(matches!(err, SignerError::InvalidInput(_)));
    }
}
