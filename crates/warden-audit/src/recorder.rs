//! Dual-write audit recorder
//!
//! One supervised side effect with two failure policies: the durable
//! store insert is required and its failure propagates to the caller;
//! the structured stream append is best-effort and its failure is logged
//! and swallowed. Keeping both policies inside `record` is what makes
//! "stream failures never fail the request" enforceable in one place.

use std::sync::Arc;

use tracing::warn;

use warden_domain::errors::DomainResult;

use crate::models::{AccessRecord, RequestContext};
use crate::store::{AuditStore, MemoryAuditStore};
use crate::stream::{AuditStream, TracingAuditStream};

/// Records access decisions through the dual-write pattern.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    stream: Arc<dyn AuditStream>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, stream: Arc<dyn AuditStream>) -> Self {
        Self { store, stream }
    }

    /// The durable store backing this recorder
    pub fn store(&self) -> Arc<dyn AuditStore> {
        self.store.clone()
    }

    /// Record one decision.
    ///
    /// Returns the stored record. A store failure propagates; the
    /// decision that triggered it must not report success. A stream
    /// failure is logged and ignored.
    pub async fn record(
        &self,
        record: AccessRecord,
        ctx: &RequestContext,
    ) -> DomainResult<AccessRecord> {
        let record = record.with_request_context(ctx);
        self.store.insert(&record).await?;

        if let Err(err) = self
            .stream
            .append(&record, ctx.request_id.as_deref())
            .await
        {
            warn!(
                record_id = %record.id,
                error = %err,
                "failed to append audit record to structured stream"
            );
        }
        Ok(record)
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryAuditStore::new()),
            Arc::new(TracingAuditStream::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use warden_domain::errors::DomainError;
    use warden_domain::value_objects::{AccessReason, CompanyId, UserId};

    use crate::query::RecordFilter;

    fn record() -> AccessRecord {
        AccessRecord::new(
            UserId::new(),
            CompanyId::new(),
            None,
            "storage",
            "files",
            "READ",
            true,
            AccessReason::Granted,
        )
    }

    struct FailingStream;

    #[async_trait]
    impl AuditStream for FailingStream {
        async fn append(&self, _: &AccessRecord, _: Option<&str>) -> DomainResult<()> {
            Err(DomainError::storage("stream unavailable"))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl AuditStore for FailingStore {
        async fn insert(&self, _: &AccessRecord) -> DomainResult<()> {
            Err(DomainError::storage("database unavailable"))
        }

        async fn fetch_page(
            &self,
            _: &RecordFilter,
            _: &crate::query::Pagination,
        ) -> DomainResult<(Vec<AccessRecord>, u64)> {
            Ok((Vec::new(), 0))
        }

        async fn fetch_all(&self, _: &RecordFilter) -> DomainResult<Vec<AccessRecord>> {
            Ok(Vec::new())
        }

        async fn count(&self, _: &RecordFilter) -> DomainResult<u64> {
            Ok(0)
        }

        async fn find_by_id(&self, _: &uuid::Uuid) -> DomainResult<Option<AccessRecord>> {
            Ok(None)
        }

        async fn purge(
            &self,
            _: chrono::DateTime<chrono::Utc>,
            _: Option<&CompanyId>,
        ) -> DomainResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_record_writes_durably_and_captures_context() {
        let store = Arc::new(MemoryAuditStore::new());
        let recorder = AuditRecorder::new(store.clone(), Arc::new(TracingAuditStream::new()));

        let ctx = RequestContext {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("test-agent".to_string()),
            request_id: Some("req-1".to_string()),
        };
        let stored = recorder.record(record(), &ctx).await.unwrap();
        assert_eq!(stored.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(stored.user_agent.as_deref(), Some("test-agent"));

        assert_eq!(store.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stream_failure_does_not_fail_record() {
        let store = Arc::new(MemoryAuditStore::new());
        let recorder = AuditRecorder::new(store.clone(), Arc::new(FailingStream));

        recorder
            .record(record(), &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(store.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let recorder = AuditRecorder::new(Arc::new(FailingStore), Arc::new(TracingAuditStream::new()));
        let result = recorder.record(record(), &RequestContext::default()).await;
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }
}
