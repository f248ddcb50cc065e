//! Logging infrastructure for the signer gateway
//!
//! Diagnostics go through `tracing`; custody events are additionally written
//! to a JSONL audit trail.

pub mod audit;

pub use audit::{AuditEvent, AuditEventType, AuditLogger};
