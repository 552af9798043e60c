/// End-to-end access decision flow over the durable SQLite backend:
/// seed the catalog and RBAC graph, run single and batch checks, and
/// verify every verdict landed in the audit trail.
use std::sync::Arc;

use warden_audit::{
    AuditRecorder, AuditService, Pagination, RecordFilter, RequestContext, SqliteAuditStore,
    TracingAuditStream,
};
use warden_domain::{
    entities::{Permission, Policy, Role, RoleAssignment},
    value_objects::{
        AccessReason, CompanyId, IdentityContext, Operation, PermissionName, ProjectId, UserId,
    },
};
use warden_engine::{AccessRequest, DecisionEngine, PermissionAggregator};
use warden_storage::SqliteRbacStore;

struct Deployment {
    engine: DecisionEngine,
    aggregator: PermissionAggregator,
    audit: AuditService,
    identity: IdentityContext,
    project: ProjectId,
}

/// One company, one user; storage:files:{READ,DELETE} in the catalog;
/// the user's role reaches READ company-wide and DELETE only within
/// `project`.
async fn deploy() -> Deployment {
    let rbac = SqliteRbacStore::in_memory().await.expect("rbac store");
    let audit_store = Arc::new(
        SqliteAuditStore::in_memory().await.expect("audit store"),
    );

    let identity = IdentityContext::new(UserId::new(), CompanyId::new());
    let company = identity.company_id;
    let project = ProjectId::new();

    let read = Permission::new(
        PermissionName::new("storage", "files", Operation::Read),
        Some("Read files".to_string()),
    );
    let delete = Permission::new(
        PermissionName::new("storage", "files", Operation::Delete),
        None,
    );
    let (read_id, delete_id) = (read.id, delete.id);
    rbac.insert_permission(read).await.unwrap();
    rbac.insert_permission(delete).await.unwrap();

    let readers = Policy::new("file-readers", "File readers", company);
    let readers_id = readers.id;
    rbac.insert_policy(readers).await.unwrap();
    rbac.attach_permission_to_policy(&readers_id, &company, &read_id)
        .await
        .unwrap();

    let deleters = Policy::new("file-deleters", "File deleters", company);
    let deleters_id = deleters.id;
    rbac.insert_policy(deleters).await.unwrap();
    rbac.attach_permission_to_policy(&deleters_id, &company, &delete_id)
        .await
        .unwrap();

    let viewer = Role::new("viewer", "Viewer", company);
    let viewer_id = viewer.id;
    rbac.insert_role(viewer).await.unwrap();
    rbac.attach_policy_to_role(&viewer_id, &company, &readers_id)
        .await
        .unwrap();

    let cleaner = Role::new("cleaner", "Cleaner", company);
    let cleaner_id = cleaner.id;
    rbac.insert_role(cleaner).await.unwrap();
    rbac.attach_policy_to_role(&cleaner_id, &company, &deleters_id)
        .await
        .unwrap();

    rbac.insert_assignment(RoleAssignment::new(identity.user_id, viewer_id, company))
        .await
        .unwrap();
    rbac.insert_assignment(
        RoleAssignment::new(identity.user_id, cleaner_id, company).with_project(project),
    )
    .await
    .unwrap();

    let recorder = AuditRecorder::new(audit_store.clone(), Arc::new(TracingAuditStream::new()));
    Deployment {
        engine: DecisionEngine::with_store(rbac.clone(), recorder),
        aggregator: PermissionAggregator::with_store(rbac),
        audit: AuditService::new(audit_store),
        identity,
        project,
    }
}

#[tokio::test]
async fn test_company_wide_grant() {
    let d = deploy().await;
    let decision = d
        .engine
        .decide(
            &d.identity,
            &AccessRequest::new("storage", "files", Operation::Read),
            &RequestContext::default(),
        )
        .await
        .unwrap();
    assert!(decision.access_granted);
    assert_eq!(decision.reason, AccessReason::Granted);
}

#[tokio::test]
async fn test_unknown_permission_denied_for_any_project() {
    let d = deploy().await;
    for project in [None, Some(d.project), Some(ProjectId::new())] {
        let mut request = AccessRequest::new("nonexistent", "resource", Operation::Read);
        request.project_id = project;
        let decision = d
            .engine
            .decide(&d.identity, &request, &RequestContext::default())
            .await
            .unwrap();
        assert!(!decision.access_granted);
        assert_eq!(decision.reason, AccessReason::NoPermission);
    }
}

#[tokio::test]
async fn test_project_scoped_grant() {
    let d = deploy().await;

    // DELETE is reachable only within the scoped project
    let scoped = AccessRequest::new("storage", "files", Operation::Delete)
        .with_project(d.project);
    let decision = d
        .engine
        .decide(&d.identity, &scoped, &RequestContext::default())
        .await
        .unwrap();
    assert!(decision.access_granted);
    assert_eq!(
        decision.matched_role.expect("matched role").role_name,
        "cleaner"
    );

    let elsewhere = AccessRequest::new("storage", "files", Operation::Delete)
        .with_project(ProjectId::new());
    let decision = d
        .engine
        .decide(&d.identity, &elsewhere, &RequestContext::default())
        .await
        .unwrap();
    assert!(!decision.access_granted);
    // The viewer assignment is still eligible there, so this denial is
    // about reachability, not eligibility
    assert_eq!(decision.reason, AccessReason::NoPermission);
}

#[tokio::test]
async fn test_batch_mixed_outcomes_in_order() {
    let d = deploy().await;
    let checks = vec![
        AccessRequest::new("storage", "files", Operation::Read),
        AccessRequest::new("storage", "files", Operation::Delete).with_project(d.project),
        AccessRequest::new("storage", "files", Operation::Delete).with_project(ProjectId::new()),
        AccessRequest::new("nonexistent", "resource", Operation::Read),
    ];
    let decisions = d
        .engine
        .decide_batch(&d.identity, &checks, &RequestContext::default())
        .await
        .unwrap();

    let outcomes: Vec<bool> = decisions.iter().map(|x| x.access_granted).collect();
    assert_eq!(outcomes, vec![true, true, false, false]);
}

#[tokio::test]
async fn test_decisions_recorded_and_queryable() {
    let d = deploy().await;
    let ctx = RequestContext {
        ip_address: Some("192.0.2.7".to_string()),
        user_agent: Some("warden-e2e".to_string()),
        request_id: Some("req-42".to_string()),
    };

    d.engine
        .decide(
            &d.identity,
            &AccessRequest::new("storage", "files", Operation::Read)
                .with_context(serde_json::json!({"origin": "e2e"})),
            &ctx,
        )
        .await
        .unwrap();
    d.engine
        .decide(
            &d.identity,
            &AccessRequest::new("storage", "files", Operation::Delete)
                .with_project(ProjectId::new()),
            &ctx,
        )
        .await
        .unwrap();

    let (records, total) = d
        .audit
        .query(&d.identity, RecordFilter::new(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(total, 2);
    // Newest first: the denial was recorded last
    assert!(!records[0].access_granted);
    assert!(records[1].access_granted);
    assert_eq!(records[1].context, serde_json::json!({"origin": "e2e"}));
    assert_eq!(records[1].ip_address.as_deref(), Some("192.0.2.7"));

    // Filter down to denials only
    let (denied, denied_total) = d
        .audit
        .query(
            &d.identity,
            RecordFilter::new().with_granted(false),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(denied_total, 1);
    assert_eq!(denied[0].operation, "DELETE");

    let record = d
        .audit
        .get_record(&d.identity, &records[0].id)
        .await
        .unwrap();
    assert_eq!(record.id, records[0].id);
}

#[tokio::test]
async fn test_aggregator_matches_decision_surface() {
    let d = deploy().await;

    // Without a project filter both grants are visible
    let effective = d
        .aggregator
        .list_effective_permissions(&d.identity, &d.identity.user_id, None)
        .await
        .unwrap();
    assert_eq!(effective.roles.len(), 2);
    assert_eq!(effective.total_permissions, 2);

    // Scoped to an unrelated project only the company-wide grant remains
    let narrowed = d
        .aggregator
        .list_effective_permissions(&d.identity, &d.identity.user_id, Some(ProjectId::new()))
        .await
        .unwrap();
    assert_eq!(narrowed.roles.len(), 1);
    assert_eq!(narrowed.permissions.len(), 1);
    assert_eq!(narrowed.permissions[0].permission_name, "storage:files:READ");
}
