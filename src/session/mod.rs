//! Session Custody Core
//!
//! Keeps one signing key sealed in memory for a bounded time and authorizes
//! signatures against a cumulative value ceiling.
//!
//! ```text
//! Inactive ──activate──▶ Active ──destroy / TTL elapsed (seen lazily)──▶ Inactive
//! ```
//!
//! Value-limit rejections and signing failures do not change state.

pub mod error;
pub mod manager;

pub use error::SessionError;
pub use manager::{SessionManager, SessionSignature, SessionStatus, Teardown};
