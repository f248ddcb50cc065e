//! HTTP routes for the session signer

pub mod health;
pub mod orders;
pub mod session;

pub use health::{health_check, version_info};
pub use orders::handle_sign_order;
pub use session::{handle_activate, handle_destroy, handle_session_status};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::SignerError;

/// JSON response with the headers every route sets
pub fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Serialize `value` as a 200 response
pub fn ok_json<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_string(value) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => error_response(SignerError::from(e)),
    }
}

/// Error body `{error, code}` with the variant's status
pub fn error_response(err: SignerError) -> Response<Full<Bytes>> {
    let (status, body) = err.into_status_code_and_body();
    json_response(status, body)
}
