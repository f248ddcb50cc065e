//! Session routes
//!
//! - `GET /v1/session` - status report (public)
//! - `POST /v1/session/activate` - reload the key and start a session (admin)
//! - `DELETE /v1/session` - destroy the session (admin)
//!
//! Admin routes answer 404 unless an admin API key is configured, and 401
//! unless the request carries it as `Authorization: Bearer <key>` or
//! `X-API-Key: <key>`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::AUTHORIZATION;
use hyper::{HeaderMap, Response};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::server::AppState;
use crate::signing::parse_decimal;
use crate::types::SignerError;

use super::{error_response, ok_json};

/// Body of `POST /v1/session/activate`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    /// Decimal ceiling; the configured default when absent
    #[serde(default)]
    pub max_value_limit: Option<String>,
}

/// Handle `GET /v1/session`
pub async fn handle_session_status(state: Arc<AppState>) -> Response<Full<Bytes>> {
    ok_json(&state.signing.session_status().await)
}

/// Handle `POST /v1/session/activate`
pub async fn handle_activate(
    state: Arc<AppState>,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    if let Err(e) = authorize_admin(&state, headers) {
        return error_response(e);
    }

    let request: ActivateRequest = if body.is_empty() {
        ActivateRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return error_response(SignerError::from(e)),
        }
    };

    let limit = match request.max_value_limit.as_deref() {
        Some(raw) => match parse_decimal("maxValueLimit", raw) {
            Ok(limit) => Some(limit),
            Err(e) => return error_response(e),
        },
        None => None,
    };

    let Some(source) = state.key_source.as_ref() else {
        return error_response(SignerError::Config("no key source configured".to_string()));
    };

    match state.signing.activate_from(source.as_ref(), limit).await {
        Ok(status) => {
            info!(address = %status.session_address, "Session activated by admin request");
            ok_json(&status)
        }
        Err(e) => {
            warn!(code = e.code(), "Admin activation failed: {}", e);
            error_response(e)
        }
    }
}

/// Handle `DELETE /v1/session`
pub async fn handle_destroy(state: Arc<AppState>, headers: &HeaderMap) -> Response<Full<Bytes>> {
    if let Err(e) = authorize_admin(&state, headers) {
        return error_response(e);
    }

    state.signing.destroy().await;
    info!("Session destroyed by admin request");
    ok_json(&state.signing.session_status().await)
}

fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), SignerError> {
    let expected = match state.args.api_key_admin.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => return Err(SignerError::NotFound("admin routes are disabled".to_string())),
    };

    let presented = extract_bearer(headers).or_else(|| {
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    });

    match presented {
        Some(key) if bool::from(key.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        Some(_) => Err(SignerError::Unauthorized("invalid admin key".to_string())),
        None => Err(SignerError::Unauthorized("admin key required".to_string())),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}
