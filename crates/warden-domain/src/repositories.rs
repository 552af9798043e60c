//! Repository contracts for the RBAC graph
//!
//! The domain layer defines only interfaces; storage backends implement
//! them. Every method is a single bounded read of the store's current
//! snapshot; the engine holds no locks across calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    entities::{Permission, Policy, Role, RoleAssignment},
    errors::DomainResult,
    value_objects::{CompanyId, PermissionId, PermissionName, PolicyId, ProjectId, RoleId, UserId},
};

/// Read-only registry of `(service, resource, operation)` capabilities.
///
/// Populated out-of-band by the seeding process.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Resolve a permission by canonical name
    async fn find_by_name(&self, name: &PermissionName) -> DomainResult<Option<Permission>>;

    /// Resolve a permission by id
    async fn find_by_id(&self, id: &PermissionId) -> DomainResult<Option<Permission>>;

    /// Resolve a batch of permissions by id
    async fn find_by_ids(&self, ids: &[PermissionId]) -> DomainResult<Vec<Permission>>;

    /// List catalog entries with pagination
    async fn list(&self, limit: usize, offset: usize) -> DomainResult<Vec<Permission>>;

    /// List catalog entries for one service
    async fn list_by_service(&self, service: &str) -> DomainResult<Vec<Permission>>;

    /// List catalog entries for one service and resource
    async fn list_by_service_and_resource(
        &self,
        service: &str,
        resource_name: &str,
    ) -> DomainResult<Vec<Permission>>;

    /// Total number of catalog entries
    async fn count(&self) -> DomainResult<u64>;
}

/// Repository for policies
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Find a policy by id within a company scope
    async fn find_by_id(&self, id: &PolicyId, company_id: &CompanyId)
        -> DomainResult<Option<Policy>>;

    /// Resolve the *active* policies among the given ids, company-scoped
    async fn find_active_by_ids(
        &self,
        ids: &[PolicyId],
        company_id: &CompanyId,
    ) -> DomainResult<Vec<Policy>>;
}

/// Repository for roles
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find a role by id within a company scope
    async fn find_by_id(&self, id: &RoleId, company_id: &CompanyId) -> DomainResult<Option<Role>>;

    /// Resolve the *active* roles among the given ids, company-scoped
    async fn find_active_by_ids(
        &self,
        ids: &[RoleId],
        company_id: &CompanyId,
    ) -> DomainResult<Vec<Role>>;
}

/// Repository for role assignments
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Enumerate the user's eligible assignments as of `now`: active,
    /// unexpired, and in scope for `project_id` (a `None` request project
    /// matches everything; a company-wide assignment matches everything).
    async fn find_eligible(
        &self,
        user_id: &UserId,
        company_id: &CompanyId,
        project_id: Option<&ProjectId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RoleAssignment>>;
}
