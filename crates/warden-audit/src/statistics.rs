//! Statistics aggregation over audit records
//!
//! One filtered record set is fanned out into three grouped
//! aggregations: per-service, per-operation, and top users. All output
//! ordering is deterministic (count descending, then key ascending).

use std::collections::HashMap;

use warden_domain::value_objects::UserId;

use crate::models::{AccessRecord, AccessStatistics, OperationActivity, ServiceActivity, UserActivity};

/// Number of users reported in the activity ranking
pub const TOP_USERS_LIMIT: usize = 10;

/// Compute aggregated statistics from a filtered record set.
pub fn compute(records: &[AccessRecord]) -> AccessStatistics {
    let total_requests = records.len() as u64;
    let granted_requests = records.iter().filter(|r| r.access_granted).count() as u64;
    let denied_requests = total_requests - granted_requests;

    let success_rate = if total_requests > 0 {
        let rate = granted_requests as f64 / total_requests as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    } else {
        0.0
    };

    let mut by_service: HashMap<&str, (u64, u64)> = HashMap::new();
    let mut by_operation: HashMap<&str, (u64, u64)> = HashMap::new();
    let mut by_user: HashMap<UserId, u64> = HashMap::new();
    for record in records {
        let service = by_service.entry(record.service.as_str()).or_default();
        service.0 += 1;
        let operation = by_operation.entry(record.operation.as_str()).or_default();
        operation.0 += 1;
        if record.access_granted {
            service.1 += 1;
            operation.1 += 1;
        }
        *by_user.entry(record.user_id).or_default() += 1;
    }

    let mut by_service: Vec<ServiceActivity> = by_service
        .into_iter()
        .map(|(service, (count, granted))| ServiceActivity {
            service: service.to_string(),
            count,
            granted,
            denied: count - granted,
        })
        .collect();
    by_service.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.service.cmp(&b.service)));

    let mut by_operation: Vec<OperationActivity> = by_operation
        .into_iter()
        .map(|(operation, (count, granted))| OperationActivity {
            operation: operation.to_string(),
            count,
            granted,
            denied: count - granted,
        })
        .collect();
    by_operation.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.operation.cmp(&b.operation))
    });

    let mut top_users: Vec<UserActivity> = by_user
        .into_iter()
        .map(|(user_id, count)| UserActivity { user_id, count })
        .collect();
    top_users.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.user_id.cmp(&b.user_id)));
    top_users.truncate(TOP_USERS_LIMIT);

    AccessStatistics {
        total_requests,
        granted_requests,
        denied_requests,
        success_rate,
        by_service,
        by_operation,
        top_users,
    }
}
