//! Best-effort structured log stream
//!
//! The second half of the dual-write: records are mirrored to a
//! structured stream for long-term/offline retention. Append failures
//! are caught by the recorder and never fail the decision or the
//! durable write.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use warden_domain::errors::{DomainError, DomainResult};

use crate::models::AccessRecord;

/// Sink for the structured audit stream.
#[async_trait]
pub trait AuditStream: Send + Sync {
    /// Append one record. `request_id` is the transport correlation id,
    /// carried on the stream only.
    async fn append(&self, record: &AccessRecord, request_id: Option<&str>) -> DomainResult<()>;
}

/// Emits records as structured tracing events, to be shipped by the
/// deployment's log pipeline.
#[derive(Clone, Default)]
pub struct TracingAuditStream;

impl TracingAuditStream {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStream for TracingAuditStream {
    async fn append(&self, record: &AccessRecord, request_id: Option<&str>) -> DomainResult<()> {
        tracing::info!(
            target: "warden::audit",
            log_id = %record.id,
            user_id = %record.user_id,
            company_id = %record.company_id,
            project_id = record.project_id.map(|p| p.to_string()),
            service = %record.service,
            resource_name = %record.resource_name,
            operation = %record.operation,
            access_granted = record.access_granted,
            reason = %record.reason,
            ip_address = record.ip_address.as_deref(),
            request_id = request_id,
            "access_log"
        );
        Ok(())
    }
}

/// Appends records as JSON lines to a file.
#[derive(Clone)]
pub struct JsonLinesAuditStream {
    path: PathBuf,
}

impl JsonLinesAuditStream {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AuditStream for JsonLinesAuditStream {
    async fn append(&self, record: &AccessRecord, request_id: Option<&str>) -> DomainResult<()> {
        let mut value = serde_json::to_value(record)
            .map_err(|e| DomainError::storage(format!("record not serializable: {e}")))?;
        if let (Some(request_id), serde_json::Value::Object(map)) = (request_id, &mut value) {
            map.insert(
                "request_id".to_string(),
                serde_json::Value::String(request_id.to_string()),
            );
        }
        let mut line = value.to_string();
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DomainError::storage(format!("open audit stream file: {e}")))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DomainError::storage(format!("append audit stream file: {e}")))?;
        Ok(())
    }
}
