//! Permission aggregator
//!
//! Flattens everything a user can currently do by walking every eligible
//! Role → Policy → Permission, using the identical eligibility filter as
//! the decision engine. Permissions are deduplicated by canonical name:
//! a permission reachable through two roles appears once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use warden_domain::{
    errors::{DomainError, DomainResult},
    repositories::{AssignmentRepository, PermissionCatalog, PolicyRepository, RoleRepository},
    value_objects::{
        CompanyId, IdentityContext, Operation, PermissionId, PolicyId, ProjectId, RoleId,
        ScopeType, UserId,
    },
};

/// One eligible role grant, with its assignment scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role_id: RoleId,
    pub role_name: String,
    pub role_display_name: String,
    pub scope_type: ScopeType,
    pub project_id: Option<ProjectId>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One policy reached through an eligible role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyView {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub policy_display_name: String,
    pub priority: i32,
}

/// One reachable permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionView {
    pub permission_id: PermissionId,
    pub permission_name: String,
    pub service: String,
    pub resource_name: String,
    pub operation: Operation,
    pub description: Option<String>,
}

/// Everything a user can currently do: three parallel, deduplicated
/// views over the eligible portion of the RBAC graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub project_id: Option<ProjectId>,
    pub roles: Vec<RoleGrant>,
    pub policies: Vec<PolicyView>,
    pub permissions: Vec<PermissionView>,
    pub total_permissions: usize,
}

impl EffectivePermissions {
    fn empty(user_id: UserId, company_id: CompanyId, project_id: Option<ProjectId>) -> Self {
        Self {
            user_id,
            company_id,
            project_id,
            roles: Vec::new(),
            policies: Vec::new(),
            permissions: Vec::new(),
            total_permissions: 0,
        }
    }
}

/// Full-permission introspection for a user.
#[derive(Clone)]
pub struct PermissionAggregator {
    catalog: Arc<dyn PermissionCatalog>,
    roles: Arc<dyn RoleRepository>,
    policies: Arc<dyn PolicyRepository>,
    assignments: Arc<dyn AssignmentRepository>,
}

impl PermissionAggregator {
    pub fn new(
        catalog: Arc<dyn PermissionCatalog>,
        roles: Arc<dyn RoleRepository>,
        policies: Arc<dyn PolicyRepository>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            catalog,
            roles,
            policies,
            assignments,
        }
    }

    /// Build an aggregator over a single store implementing every
    /// repository contract.
    pub fn with_store<S>(store: S) -> Self
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
        }
    }

    /// List a user's effective roles, policies, and permissions.
    ///
    /// Perimeter rule: a caller may only aggregate its own permissions.
    /// A request for another user is rejected with `Forbidden` before
    /// any graph traversal occurs; this is an identity check, not an
    /// RBAC decision.
    pub async fn list_effective_permissions(
        &self,
        identity: &IdentityContext,
        user_id: &UserId,
        project_id: Option<ProjectId>,
    ) -> DomainResult<EffectivePermissions> {
        if *user_id != identity.user_id {
            return Err(DomainError::Forbidden {
                reason: "You can only view your own permissions".to_string(),
            });
        }

        let now = Utc::now();
        let candidates = self
            .assignments
            .find_eligible(user_id, &identity.company_id, project_id.as_ref(), now)
            .await?;
        if candidates.is_empty() {
            return Ok(EffectivePermissions::empty(
                *user_id,
                identity.company_id,
                project_id,
            ));
        }

        let mut role_ids: Vec<RoleId> = Vec::new();
        for assignment in &candidates {
            if !role_ids.contains(&assignment.role_id) {
                role_ids.push(assignment.role_id);
            }
        }
        let roles = self
            .roles
            .find_active_by_ids(&role_ids, &identity.company_id)
            .await?;
        let roles_by_id: HashMap<RoleId, _> = roles.into_iter().map(|r| (r.id, r)).collect();

        let mut role_grants = Vec::new();
        let mut seen_policies: HashSet<PolicyId> = HashSet::new();
        let mut policy_views = Vec::new();
        let mut permission_ids: Vec<PermissionId> = Vec::new();

        for assignment in &candidates {
            let Some(role) = roles_by_id.get(&assignment.role_id) else {
                continue;
            };
            role_grants.push(RoleGrant {
                role_id: role.id,
                role_name: role.name.clone(),
                role_display_name: role.display_name.clone(),
                scope_type: assignment.scope_type,
                project_id: assignment.project_id,
                expires_at: assignment.expires_at,
            });

            let policies = self
                .policies
                .find_active_by_ids(&role.policy_ids, &identity.company_id)
                .await?;
            for policy in policies {
                if !seen_policies.insert(policy.id) {
                    continue;
                }
                policy_views.push(PolicyView {
                    policy_id: policy.id,
                    policy_name: policy.name.clone(),
                    policy_display_name: policy.display_name.clone(),
                    priority: policy.priority,
                });
                for permission_id in &policy.permission_ids {
                    if !permission_ids.contains(permission_id) {
                        permission_ids.push(*permission_id);
                    }
                }
            }
        }

        // Deduplicate by canonical name: two catalog ids carrying the
        // same name collapse into one view entry.
        let permissions = self.catalog.find_by_ids(&permission_ids).await?;
        let mut seen_names: HashSet<String> = HashSet::new();
        let mut permission_views = Vec::new();
        for permission in permissions {
            if !seen_names.insert(permission.name.canonical()) {
                continue;
            }
            permission_views.push(PermissionView {
                permission_id: permission.id,
                permission_name: permission.name.canonical(),
                service: permission.name.service().to_string(),
                resource_name: permission.name.resource_name().to_string(),
                operation: permission.name.operation().clone(),
                description: permission.description.clone(),
            });
        }

        info!(
            user_id = %user_id,
            company_id = %identity.company_id,
            total_permissions = permission_views.len(),
            "aggregated effective permissions"
        );

        Ok(EffectivePermissions {
            user_id: *user_id,
            company_id: identity.company_id,
            project_id,
            roles: role_grants,
            policies: policy_views,
            total_permissions: permission_views.len(),
            permissions: permission_views,
        })
    }
}
