//! Decision engine
//!
//! Resolves a grant/deny verdict by traversing the requester's eligible
//! assignments through Role → Policy → Permission. Reason codes are a
//! closed set:
//!
//! - `no_permission`: the target permission does not exist in the
//!   catalog, or exists but is reachable through none of the
//!   requester's eligible roles;
//! - `no_matching_role`: the requester has no eligible assignment at
//!   all (none assigned, all expired, all inactive, or all scoped to a
//!   different project);
//! - `granted`: the permission is reachable; ties between assignments
//!   are broken by earliest `granted_at`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use warden_audit::{AccessRecord, AuditRecorder, RequestContext};
use warden_common::validation::{BatchSizeValidator, Validatable, Validator};
use warden_domain::{
    entities::{Policy, Role, RoleAssignment},
    errors::{DomainError, DomainResult},
    repositories::{AssignmentRepository, PermissionCatalog, PolicyRepository, RoleRepository},
    value_objects::{AccessReason, IdentityContext, PolicyId, ProjectId, RoleId, ScopeType},
};

use crate::request::AccessRequest;

/// Largest accepted batch of checks
pub const MAX_BATCH_SIZE: usize = 50;

/// The role through which a granted decision was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRole {
    pub role_id: RoleId,
    pub role_name: String,
    pub scope_type: ScopeType,
    pub project_id: Option<ProjectId>,
}

/// Grant/deny verdict with a diagnostic reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub access_granted: bool,
    pub reason: AccessReason,
    pub message: String,
    pub matched_role: Option<MatchedRole>,
}

impl AccessDecision {
    fn granted(permission: &str, matched_role: MatchedRole) -> Self {
        Self {
            access_granted: true,
            reason: AccessReason::Granted,
            message: format!("User has permission {permission}"),
            matched_role: Some(matched_role),
        }
    }

    fn denied(reason: AccessReason, message: String) -> Self {
        Self {
            access_granted: false,
            reason,
            message,
            matched_role: None,
        }
    }
}

/// Stateless-per-call authorization decision engine.
///
/// Each `decide` opens a read-only traversal of the store's current
/// snapshot and takes no locks; concurrent decisions are independent.
/// The single synchronization point is the durable audit write, which
/// must complete before the decision is returned.
#[derive(Clone)]
pub struct DecisionEngine {
    catalog: Arc<dyn PermissionCatalog>,
    roles: Arc<dyn RoleRepository>,
    policies: Arc<dyn PolicyRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    recorder: AuditRecorder,
}

impl DecisionEngine {
    pub fn new(
        catalog: Arc<dyn PermissionCatalog>,
        roles: Arc<dyn RoleRepository>,
        policies: Arc<dyn PolicyRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            catalog,
            roles,
            policies,
            assignments,
            recorder,
        }
    }

    /// Build an engine over a single store implementing every repository
    /// contract.
    pub fn with_store<S>(store: S, recorder: AuditRecorder) -> Self
    where
        S: PermissionCatalog
            + RoleRepository
            + PolicyRepository
            + AssignmentRepository
            + Clone
            + 'static,
    {
        Self {
            catalog: Arc::new(store.clone()),
            roles: Arc::new(store.clone()),
            policies: Arc::new(store.clone()),
            assignments: Arc::new(store),
            recorder,
        }
    }

    /// Decide one access check and record the verdict.
    pub async fn decide(
        &self,
        identity: &IdentityContext,
        request: &AccessRequest,
        ctx: &RequestContext,
    ) -> DomainResult<AccessDecision> {
        request.validate().map_err(DomainError::from)?;

        let decision = self.evaluate(identity, request).await?;
        self.record(identity, request, &decision, ctx).await?;

        info!(
            user_id = %identity.user_id,
            company_id = %identity.company_id,
            permission = %request.permission_name(),
            access_granted = decision.access_granted,
            reason = %decision.reason,
            "access decision"
        );
        Ok(decision)
    }

    /// Decide up to [`MAX_BATCH_SIZE`] checks independently, preserving
    /// input order. A batch of size 0 or above the cap is rejected
    /// wholesale before any check executes.
    pub async fn decide_batch(
        &self,
        identity: &IdentityContext,
        requests: &[AccessRequest],
        ctx: &RequestContext,
    ) -> DomainResult<Vec<AccessDecision>> {
        BatchSizeValidator::new("checks", 1, MAX_BATCH_SIZE)
            .validate(&requests.len())
            .map_err(DomainError::from)?;

        let mut decisions = Vec::with_capacity(requests.len());
        for request in requests {
            decisions.push(self.decide(identity, request, ctx).await?);
        }
        Ok(decisions)
    }

    /// Pure traversal: no side effects, no audit.
    async fn evaluate(
        &self,
        identity: &IdentityContext,
        request: &AccessRequest,
    ) -> DomainResult<AccessDecision> {
        let permission_name = request.permission_name();

        // Absence from the catalog is a verdict, independent of the
        // requester's assignments.
        let permission = match self.catalog.find_by_name(&permission_name).await? {
            Some(permission) => permission,
            None => {
                debug!(permission = %permission_name, "permission not in catalog");
                return Ok(AccessDecision::denied(
                    AccessReason::NoPermission,
                    format!("Permission '{permission_name}' does not exist in the system"),
                ));
            }
        };

        let now = Utc::now();
        let candidates = self
            .assignments
            .find_eligible(
                &identity.user_id,
                &identity.company_id,
                request.project_id.as_ref(),
                now,
            )
            .await?;
        if candidates.is_empty() {
            return Ok(AccessDecision::denied(
                AccessReason::NoMatchingRole,
                "User does not have any active roles".to_string(),
            ));
        }

        let (roles_by_id, policies_by_id) = self
            .load_role_graph(identity, &candidates)
            .await?;

        // Candidates arrive ordered by granted_at, so the first match is
        // the earliest grant.
        for assignment in &candidates {
            let Some(role) = roles_by_id.get(&assignment.role_id) else {
                continue;
            };
            let reachable = role.policy_ids.iter().any(|policy_id| {
                policies_by_id
                    .get(policy_id)
                    .is_some_and(|policy| policy.contains_permission(&permission.id))
            });
            if reachable {
                return Ok(AccessDecision::granted(
                    &permission_name.canonical(),
                    MatchedRole {
                        role_id: role.id,
                        role_name: role.name.clone(),
                        scope_type: assignment.scope_type,
                        project_id: assignment.project_id,
                    },
                ));
            }
        }

        Ok(AccessDecision::denied(
            AccessReason::NoPermission,
            format!("User does not have permission {permission_name}"),
        ))
    }

    /// Resolve the candidates' active roles and those roles' active
    /// policies in two batched reads.
    async fn load_role_graph(
        &self,
        identity: &IdentityContext,
        candidates: &[RoleAssignment],
    ) -> DomainResult<(HashMap<RoleId, Role>, HashMap<PolicyId, Policy>)> {
        let mut role_ids: Vec<RoleId> = Vec::new();
        for assignment in candidates {
            if !role_ids.contains(&assignment.role_id) {
                role_ids.push(assignment.role_id);
            }
        }
        let roles = self
            .roles
            .find_active_by_ids(&role_ids, &identity.company_id)
            .await?;

        let mut policy_ids: Vec<PolicyId> = Vec::new();
        for role in &roles {
            for policy_id in &role.policy_ids {
                if !policy_ids.contains(policy_id) {
                    policy_ids.push(*policy_id);
                }
            }
        }
        let policies = self
            .policies
            .find_active_by_ids(&policy_ids, &identity.company_id)
            .await?;

        Ok((
            roles.into_iter().map(|r| (r.id, r)).collect(),
            policies.into_iter().map(|p| (p.id, p)).collect(),
        ))
    }

    async fn record(
        &self,
        identity: &IdentityContext,
        request: &AccessRequest,
        decision: &AccessDecision,
        ctx: &RequestContext,
    ) -> DomainResult<()> {
        let mut record = AccessRecord::new(
            identity.user_id,
            identity.company_id,
            request.project_id,
            &request.service,
            &request.resource_name,
            request.operation.as_str(),
            decision.access_granted,
            decision.reason,
        );
        if let Some(resource_id) = &request.resource_id {
            record = record.with_resource_id(resource_id);
        }
        if let Some(context) = &request.context {
            record = record.with_context(context.clone());
        }
        self.recorder.record(record, ctx).await?;
        Ok(())
    }
}
