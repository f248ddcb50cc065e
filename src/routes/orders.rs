//! Order signing route
//!
//! `POST /v1/orders/sign` with body `{"order": {...}}`. Numeric order fields
//! must be decimal strings.

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;
use tracing::debug;

use crate::server::AppState;
use crate::signing::SignOrderRequest;
use crate::types::SignerError;

use super::{error_response, ok_json};

/// Handle `POST /v1/orders/sign`
pub async fn handle_sign_order(state: Arc<AppState>, body: Bytes) -> Response<Full<Bytes>> {
    let request: SignOrderRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected sign request body: {}", e);
            return error_response(SignerError::from(e));
        }
    };

    match state.signing.sign_order(request).await {
        Ok(signed) => ok_json(&signed),
        Err(e) => error_response(e),
    }
}
