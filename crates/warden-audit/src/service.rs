//! Audit query, statistics, and retention service
//!
//! Every read is scoped to the caller's company: caller-supplied company
//! filters cannot widen the view, and a record belonging to another
//! company is reported as not found rather than forbidden, so record ids
//! leak nothing across tenants.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use warden_domain::{
    errors::{DomainError, DomainResult},
    value_objects::{CompanyId, IdentityContext, ProjectId},
};

use crate::models::{AccessRecord, AccessStatistics};
use crate::query::{Pagination, RecordFilter};
use crate::statistics;
use crate::store::AuditStore;

/// Minimum retention floor for the purge operation, in days.
///
/// A compliance guardrail: purge requests reaching into this window are
/// rejected outright, never clamped.
pub const MIN_RETENTION_DAYS: i64 = 30;

/// Company-scoped audit queries and retention management.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// List audit records with filtering and pagination, newest first.
    ///
    /// Returns the page together with the total match count. The
    /// caller's company is always pinned onto the filter.
    pub async fn query(
        &self,
        identity: &IdentityContext,
        filter: RecordFilter,
        pagination: Pagination,
    ) -> DomainResult<(Vec<AccessRecord>, u64)> {
        pagination.validate()?;
        let filter = filter.with_company(identity.company_id);
        self.store.fetch_page(&filter, &pagination).await
    }

    /// Count matching records without fetching a page.
    pub async fn count(
        &self,
        identity: &IdentityContext,
        filter: RecordFilter,
    ) -> DomainResult<u64> {
        let filter = filter.with_company(identity.company_id);
        self.store.count(&filter).await
    }

    /// Fetch one record by id.
    ///
    /// A record belonging to another company is reported as not found.
    pub async fn get_record(
        &self,
        identity: &IdentityContext,
        id: &Uuid,
    ) -> DomainResult<AccessRecord> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .filter(|r| r.company_id == identity.company_id)
            .ok_or_else(|| DomainError::not_found("AccessRecord", id))?;
        Ok(record)
    }

    /// Aggregated statistics over the caller's company, optionally
    /// narrowed by project and time window.
    pub async fn statistics(
        &self,
        identity: &IdentityContext,
        project_id: Option<ProjectId>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DomainResult<AccessStatistics> {
        let mut filter = RecordFilter::new().with_company(identity.company_id);
        filter.project_id = project_id;
        filter.from = from;
        filter.to = to;
        let records = self.store.fetch_all(&filter).await?;
        Ok(statistics::compute(&records))
    }

    /// Hard-delete the caller's company records strictly older than
    /// `before`. Returns the number of deleted records.
    ///
    /// A `before` less than `MIN_RETENTION_DAYS` in the past violates
    /// the retention floor and is rejected. A `company_id` other than
    /// the caller's own is forbidden.
    pub async fn purge(
        &self,
        identity: &IdentityContext,
        before: DateTime<Utc>,
        company_id: Option<CompanyId>,
    ) -> DomainResult<u64> {
        if let Some(company_id) = company_id {
            if company_id != identity.company_id {
                return Err(DomainError::Forbidden {
                    reason: "cannot purge audit records of another company".to_string(),
                });
            }
        }

        let floor = Utc::now() - Duration::days(MIN_RETENTION_DAYS);
        if before > floor {
            return Err(DomainError::RetentionViolation {
                reason: format!(
                    "cannot delete records newer than {MIN_RETENTION_DAYS} days"
                ),
            });
        }

        let deleted = self
            .store
            .purge(before, Some(&identity.company_id))
            .await?;
        info!(
            company_id = %identity.company_id,
            before = %before,
            deleted,
            "purged audit records"
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_domain::value_objects::{AccessReason, UserId};

    use crate::store::MemoryAuditStore;

    fn identity() -> IdentityContext {
        IdentityContext::new(UserId::new(), CompanyId::new())
    }

    fn record(company: CompanyId, age_days: i64) -> AccessRecord {
        let mut r = AccessRecord::new(
            UserId::new(),
            company,
            None,
            "storage",
            "files",
            "READ",
            true,
            AccessReason::Granted,
        );
        r.created_at = Utc::now() - Duration::days(age_days);
        r
    }

    async fn service_with(records: Vec<AccessRecord>) -> (AuditService, Arc<MemoryAuditStore>) {
        let store = Arc::new(MemoryAuditStore::new());
        for r in &records {
            store.insert(r).await.unwrap();
        }
        (AuditService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_query_is_pinned_to_callers_company() {
        let identity = identity();
        let (service, _) = service_with(vec![
            record(identity.company_id, 1),
            record(CompanyId::new(), 1),
        ])
        .await;

        // Even an explicit foreign-company filter is overridden
        let foreign = RecordFilter::new().with_company(CompanyId::new());
        let (records, total) = service
            .query(&identity, foreign, Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(records[0].company_id, identity.company_id);
    }

    #[tokio::test]
    async fn test_query_rejects_zero_page() {
        let identity = identity();
        let (service, _) = service_with(vec![]).await;
        let result = service
            .query(&identity, RecordFilter::new(), Pagination::new(0, 10))
            .await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_get_record_masks_foreign_company_as_not_found() {
        let identity = identity();
        let foreign = record(CompanyId::new(), 1);
        let foreign_id = foreign.id;
        let own = record(identity.company_id, 1);
        let own_id = own.id;
        let (service, _) = service_with(vec![foreign, own]).await;

        assert!(service.get_record(&identity, &own_id).await.is_ok());
        assert!(matches!(
            service.get_record(&identity, &foreign_id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_purge_enforces_retention_floor() {
        let identity = identity();
        let (service, _) = service_with(vec![record(identity.company_id, 40)]).await;

        let too_recent = Utc::now() - Duration::days(10);
        assert!(matches!(
            service.purge(&identity, too_recent, None).await,
            Err(DomainError::RetentionViolation { .. })
        ));

        let allowed = Utc::now() - Duration::days(31);
        assert_eq!(service.purge(&identity, allowed, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_rejects_foreign_company() {
        let identity = identity();
        let (service, _) = service_with(vec![]).await;
        let result = service
            .purge(
                &identity,
                Utc::now() - Duration::days(40),
                Some(CompanyId::new()),
            )
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_purge_only_touches_own_company() {
        let identity = identity();
        let other = CompanyId::new();
        let (service, store) = service_with(vec![
            record(identity.company_id, 40),
            record(other, 40),
        ])
        .await;

        let deleted = service
            .purge(&identity, Utc::now() - Duration::days(35), None)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_statistics_scoped_and_zero_safe() {
        let identity = identity();
        let (service, _) = service_with(vec![record(CompanyId::new(), 1)]).await;

        let stats = service
            .statistics(&identity, None, None, None)
            .await
            .unwrap();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.success_rate, 0.0);
    }
}
