//! Audit record and statistics models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_domain::value_objects::{AccessReason, CompanyId, ProjectId, UserId};

/// Append-only fact of one access decision.
///
/// Records are never mutated; they are removed only by the retention
/// purge. The `context` blob is stored and returned opaquely, never
/// interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub project_id: Option<ProjectId>,
    pub service: String,
    pub resource_name: String,
    pub operation: String,
    pub access_granted: bool,
    pub reason: AccessReason,
    pub resource_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AccessRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        company_id: CompanyId,
        project_id: Option<ProjectId>,
        service: &str,
        resource_name: &str,
        operation: &str,
        access_granted: bool,
        reason: AccessReason,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            company_id,
            project_id,
            service: service.to_string(),
            resource_name: resource_name.to_string(),
            operation: operation.to_string(),
            access_granted,
            reason,
            resource_id: None,
            ip_address: None,
            user_agent: None,
            context: serde_json::Value::Object(serde_json::Map::new()),
            created_at: Utc::now(),
        }
    }

    /// Attach transport metadata from the request context
    pub fn with_request_context(mut self, ctx: &RequestContext) -> Self {
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    /// Attach the opaque caller-supplied context blob
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }
}

/// Transport-level metadata forwarded by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Correlation id, emitted on the structured stream only
    pub request_id: Option<String>,
}

/// Per-service activity breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceActivity {
    pub service: String,
    pub count: u64,
    pub granted: u64,
    pub denied: u64,
}

/// Per-operation activity breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationActivity {
    pub operation: String,
    pub count: u64,
    pub granted: u64,
    pub denied: u64,
}

/// Record count for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: UserId,
    pub count: u64,
}

/// Aggregated audit statistics.
///
/// `success_rate` is a percentage rounded to two decimals; it is exactly
/// `0.0` (never NaN) when `total_requests` is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessStatistics {
    pub total_requests: u64,
    pub granted_requests: u64,
    pub denied_requests: u64,
    pub success_rate: f64,
    pub by_service: Vec<ServiceActivity>,
    pub by_operation: Vec<OperationActivity>,
    pub top_users: Vec<UserActivity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_to_empty_context() {
        let record = AccessRecord::new(
            UserId::new(),
            CompanyId::new(),
            None,
            "storage",
            "files",
            "READ",
            true,
            AccessReason::Granted,
        );
        assert_eq!(record.context, serde_json::json!({}));
        assert!(record.ip_address.is_none());
    }

    #[test]
    fn test_context_blob_is_preserved_opaquely() {
        let blob = serde_json::json!({"nested": {"anything": [1, 2, 3]}, "flag": true});
        let record = AccessRecord::new(
            UserId::new(),
            CompanyId::new(),
            None,
            "storage",
            "files",
            "READ",
            false,
            AccessReason::NoPermission,
        )
        .with_context(blob.clone());
        assert_eq!(record.context, blob);

        let round_trip: AccessRecord =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(round_trip.context, blob);
    }
}
