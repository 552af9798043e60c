//! RBAC entities
//!
//! The graph is Permission ∈ Policy ∈ Role ∈ RoleAssignment, modeled as
//! owned id-collections resolved through the repository traits. Policies
//! and roles are company-scoped; assignments bind a role to a user within
//! a company, optionally narrowed to one project and bounded in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{
    CompanyId, PermissionId, PermissionName, PolicyId, ProjectId, RoleId, ScopeType, UserId,
};

/// Immutable catalog entry: one `(service, resource, operation)` capability.
///
/// Catalog rows are created and updated only by the external seeding
/// process; this core reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: PermissionName,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(name: PermissionName, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PermissionId::new(),
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Company-scoped named set of permissions.
///
/// `priority` is advisory ordering/reporting metadata; it never changes a
/// grant outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub company_id: CompanyId,
    pub priority: i32,
    pub is_active: bool,
    pub permission_ids: Vec<PermissionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    pub fn new(name: &str, display_name: &str, company_id: CompanyId) -> Self {
        let now = Utc::now();
        Self {
            id: PolicyId::new(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: None,
            company_id,
            priority: 0,
            is_active: true,
            permission_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains_permission(&self, permission_id: &PermissionId) -> bool {
        self.permission_ids.contains(permission_id)
    }
}

/// Company-scoped named set of policies, assignable to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub company_id: CompanyId,
    pub is_active: bool,
    pub policy_ids: Vec<PolicyId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: &str, display_name: &str, company_id: CompanyId) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: None,
            company_id,
            is_active: true,
            policy_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Grant of one role to one user within a company.
///
/// `project_id = None` means company-wide: the assignment matches every
/// project. `expires_at = None` means permanent. At most one *active*
/// assignment may exist per (user, role, company, project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: uuid::Uuid,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub company_id: CompanyId,
    pub project_id: Option<ProjectId>,
    pub scope_type: ScopeType,
    pub granted_by: Option<UserId>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn new(user_id: UserId, role_id: RoleId, company_id: CompanyId) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            user_id,
            role_id,
            company_id,
            project_id: None,
            scope_type: ScopeType::Direct,
            granted_by: None,
            granted_at: now,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Narrow the assignment to one project
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Bound the assignment in time
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_scope_type(mut self, scope_type: ScopeType) -> Self {
        self.scope_type = scope_type;
        self
    }

    pub fn with_granted_by(mut self, granted_by: UserId) -> Self {
        self.granted_by = Some(granted_by);
        self
    }

    /// An assignment whose `expires_at` is in the past behaves identically
    /// to an absent one.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// Project scope check: a request without a project matches every
    /// assignment; a company-wide assignment matches every request.
    pub fn matches_project(&self, project_id: Option<&ProjectId>) -> bool {
        match (project_id, &self.project_id) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(requested), Some(assigned)) => requested == assigned,
        }
    }

    /// Eligibility: active, unexpired, and in scope for the request's
    /// project. Both storage backends and the decision engine share this
    /// single definition.
    pub fn is_eligible(&self, project_id: Option<&ProjectId>, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && self.matches_project(project_id)
    }
}
