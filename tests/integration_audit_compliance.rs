/// Compliance behavior of the audit trail across crates: dual-write to
/// a JSON-lines stream, statistics aggregation, and the retention-floor
/// guarded purge.
use std::sync::Arc;

use chrono::{Duration, Utc};
use warden_audit::{
    AccessRecord, AuditRecorder, AuditService, AuditStore, JsonLinesAuditStream, Pagination,
    RecordFilter, RequestContext, SqliteAuditStore,
};
use warden_domain::{
    errors::DomainError,
    value_objects::{AccessReason, CompanyId, IdentityContext, UserId},
};

fn record(company: CompanyId, user: UserId, granted: bool, age_days: i64) -> AccessRecord {
    let mut r = AccessRecord::new(
        user,
        company,
        None,
        "storage",
        "files",
        if granted { "READ" } else { "DELETE" },
        granted,
        if granted {
            AccessReason::Granted
        } else {
            AccessReason::NoPermission
        },
    );
    r.created_at = Utc::now() - Duration::days(age_days);
    r
}

#[tokio::test]
async fn test_dual_write_reaches_stream_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("audit.jsonl");

    let store = Arc::new(SqliteAuditStore::in_memory().await.unwrap());
    let recorder = AuditRecorder::new(store.clone(), Arc::new(JsonLinesAuditStream::new(&path)));

    let identity = IdentityContext::new(UserId::new(), CompanyId::new());
    let ctx = RequestContext {
        request_id: Some("req-7".to_string()),
        ..Default::default()
    };
    recorder
        .record(
            record(identity.company_id, identity.user_id, true, 0),
            &ctx,
        )
        .await
        .unwrap();

    // Durable half
    assert_eq!(store.count(&RecordFilter::new()).await.unwrap(), 1);

    // Best-effort half
    let contents = std::fs::read_to_string(&path).unwrap();
    let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(line["request_id"], "req-7");
    assert_eq!(line["access_granted"], true);
}

#[tokio::test]
async fn test_statistics_over_filtered_window() {
    let store = Arc::new(SqliteAuditStore::in_memory().await.unwrap());
    let identity = IdentityContext::new(UserId::new(), CompanyId::new());
    let company = identity.company_id;

    let heavy_user = UserId::new();
    for _ in 0..3 {
        store
            .insert(&record(company, heavy_user, true, 1))
            .await
            .unwrap();
    }
    store
        .insert(&record(company, identity.user_id, false, 1))
        .await
        .unwrap();
    // Outside the window and outside the company
    store
        .insert(&record(company, heavy_user, true, 90))
        .await
        .unwrap();
    store
        .insert(&record(CompanyId::new(), UserId::new(), true, 1))
        .await
        .unwrap();

    let service = AuditService::new(store);
    let stats = service
        .statistics(
            &identity,
            None,
            Some(Utc::now() - Duration::days(7)),
            None,
        )
        .await
        .unwrap();

    assert_eq!(stats.total_requests, 4);
    assert_eq!(stats.granted_requests, 3);
    assert_eq!(stats.denied_requests, 1);
    assert_eq!(stats.success_rate, 75.0);

    assert_eq!(stats.by_service.len(), 1);
    assert_eq!(stats.by_service[0].service, "storage");
    assert_eq!(stats.by_service[0].denied, 1);

    let read = stats
        .by_operation
        .iter()
        .find(|o| o.operation == "READ")
        .unwrap();
    assert_eq!(read.count, 3);
    assert_eq!(read.denied, 0);

    assert_eq!(stats.top_users[0].user_id, heavy_user);
    assert_eq!(stats.top_users[0].count, 3);
}

#[tokio::test]
async fn test_purge_retention_floor_and_count() {
    let store = Arc::new(SqliteAuditStore::in_memory().await.unwrap());
    let identity = IdentityContext::new(UserId::new(), CompanyId::new());
    let company = identity.company_id;

    // 5 records older than 40 days, 3 newer
    for age in [41, 45, 50, 60, 70] {
        store
            .insert(&record(company, identity.user_id, true, age))
            .await
            .unwrap();
    }
    for age in [1, 5, 10] {
        store
            .insert(&record(company, identity.user_id, true, age))
            .await
            .unwrap();
    }

    let service = AuditService::new(store);

    // Ten days is inside the retention floor
    let result = service
        .purge(&identity, Utc::now() - Duration::days(10), None)
        .await;
    assert!(matches!(result, Err(DomainError::RetentionViolation { .. })));

    // Forty days is allowed and deletes exactly the 5 older records
    let deleted = service
        .purge(&identity, Utc::now() - Duration::days(40), None)
        .await
        .unwrap();
    assert_eq!(deleted, 5);

    // The 3 newer records remain queryable
    let (remaining, total) = service
        .query(&identity, RecordFilter::new(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(remaining.len(), 3);
}

#[tokio::test]
async fn test_count_only_query() {
    let store = Arc::new(SqliteAuditStore::in_memory().await.unwrap());
    let identity = IdentityContext::new(UserId::new(), CompanyId::new());
    for granted in [true, true, false] {
        store
            .insert(&record(identity.company_id, identity.user_id, granted, 1))
            .await
            .unwrap();
    }

    let service = AuditService::new(store);
    assert_eq!(
        service
            .count(&identity, RecordFilter::new())
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        service
            .count(&identity, RecordFilter::new().with_granted(false))
            .await
            .unwrap(),
        1
    );
}
