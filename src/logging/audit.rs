//! Custody audit trail
//!
//! Writes one JSONL line per custody event (activation, signature, rejection,
//! teardown) to an append-only file. Never records key material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// New session sealed and started
    SessionActivated,
    /// Order signed and spend committed
    OrderSigned,
    /// Sign request refused (no session, limit, signer failure)
    SignRejected,
    /// Session explicitly destroyed
    SessionDestroyed,
    /// Session found expired and torn down
    SessionExpired,
}

/// A single audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: AuditEventType,
    /// Signer instance that handled the event
    pub instance_id: String,
    /// Session signer address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Order value (decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_value: Option<String>,
    /// Cumulative value after the event (decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_used: Option<String>,
    /// Session ceiling (decimal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_limit: Option<String>,
    /// Machine-readable rejection code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, instance_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            instance_id,
            address: None,
            order_value: None,
            value_used: None,
            max_value_limit: None,
            reason: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_order_value(mut self, value: impl ToString) -> Self {
        self.order_value = Some(value.to_string());
        self
    }

    pub fn with_value_used(mut self, value: impl ToString) -> Self {
        self.value_used = Some(value.to_string());
        self
    }

    pub fn with_max_value_limit(mut self, value: impl ToString) -> Self {
        self.max_value_limit = Some(value.to_string());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger writing JSONL to an optional file
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
    instance_id: String,
}

struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    /// Create a logger with no file attached (events go nowhere until
    /// `init_file` is called)
    pub fn new(instance_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuditLoggerInner {
                writer: None,
                path: None,
            })),
            instance_id,
        }
    }

    /// Append events to `path`
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));
        inner.path = Some(path.clone());

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    /// Start an event stamped with this instance
    pub fn event(&self, event_type: AuditEventType) -> AuditEvent {
        AuditEvent::new(event_type, self.instance_id.clone())
    }

    /// Record an event. Failures are logged, never propagated.
    pub async fn log(&self, event: AuditEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }

    /// Path of the attached file, if any
    pub async fn path(&self) -> Option<PathBuf> {
        self.inner.lock().await.path.clone()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}
