//! Health check endpoints
//!
//! - /health - Liveness probe, always 200 while the process is serving
//! - /version - Build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

use super::ok_json;

/// Liveness response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    /// Whether a non-expired session is currently held
    pub session_active: bool,
    /// Whether a key source is configured for (re-)activation
    pub key_source_configured: bool,
    pub admin_enabled: bool,
    pub timestamp: String,
}

/// Handle liveness probe (/health)
///
/// Does not tear down an expired session; use `/v1/session` for that.
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        session_active: state.signing.sessions().is_active().await,
        key_source_configured: state.key_source.is_some(),
        admin_enabled: state.args.admin_enabled(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    ok_json(&response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    ok_json(&VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: env!("CARGO_PKG_NAME"),
    })
}
