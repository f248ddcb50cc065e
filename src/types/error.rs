//! Caller-visible error taxonomy
//!
//! Every failure that can reach a remote caller is expressed as a
//! `SignerError`. Each variant maps to its own HTTP status and a stable
//! machine-readable code so automated clients can branch on it (re-activate
//! and retry, or abandon).

use hyper::StatusCode;

use crate::key_source::KeySourceError;
use crate::session::SessionError;

/// Main error type for signer operations
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("Session expired")]
    SessionExpired,

    #[error("Cumulative value limit exceeded")]
    ValueLimitExceeded,

    #[error("Signing failed: {0}")]
    SigningFailure(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Key source error: {0}")]
    KeySource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignerError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NoActiveSession => StatusCode::PRECONDITION_FAILED,
            Self::SessionExpired => StatusCode::GONE,
            Self::ValueLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::SigningFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::KeySource(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code for clients that branch on the failure category
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::ValueLimitExceeded => "VALUE_LIMIT_EXCEEDED",
            Self::SigningFailure(_) => "SIGNING_FAILURE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::KeySource(_) => "KEY_SOURCE",
            Self::Config(_) => "CONFIG",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Convert to status code and JSON body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, body.to_string())
    }
}

impl From<SessionError> for SignerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoActiveSession => Self::NoActiveSession,
            SessionError::SessionExpired => Self::SessionExpired,
            SessionError::ValueLimitExceeded { .. } => Self::ValueLimitExceeded,
            SessionError::SigningFailure(e) => Self::SigningFailure(e.to_string()),
            SessionError::InvalidKey(e) => Self::KeySource(e.to_string()),
            SessionError::Custody(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<KeySourceError> for SignerError {
    fn from(err: KeySourceError) -> Self {
        Self::KeySource(err.to_string())
    }
}

impl From<std::io::Error> for SignerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for SignerError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for signer operations
pub type Result<T> = std::result::Result<T, SignerError>;
