//! In-memory storage implementation for testing and embedded use

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use warden_domain::{
    entities::{Permission, Policy, Role, RoleAssignment},
    errors::{DomainError, DomainResult},
    repositories::{AssignmentRepository, PermissionCatalog, PolicyRepository, RoleRepository},
    value_objects::{CompanyId, PermissionId, PermissionName, PolicyId, ProjectId, RoleId, UserId},
};

#[derive(Default)]
struct State {
    permissions: HashMap<PermissionId, Permission>,
    policies: HashMap<PolicyId, Policy>,
    roles: HashMap<RoleId, Role>,
    assignments: HashMap<uuid::Uuid, RoleAssignment>,
}

/// In-memory RBAC store.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryRbacStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a catalog entry. Canonical names are globally unique.
    pub async fn insert_permission(&self, permission: Permission) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state
            .permissions
            .values()
            .any(|p| p.name == permission.name)
        {
            return Err(DomainError::validation(
                "permission_name",
                format!("permission '{}' already exists", permission.name),
            ));
        }
        state.permissions.insert(permission.id, permission);
        Ok(())
    }

    /// Insert a policy. Names are unique per company.
    pub async fn insert_policy(&self, policy: Policy) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state
            .policies
            .values()
            .any(|p| p.name == policy.name && p.company_id == policy.company_id)
        {
            return Err(DomainError::validation(
                "policy_name",
                format!("policy '{}' already exists in this company", policy.name),
            ));
        }
        state.policies.insert(policy.id, policy);
        Ok(())
    }

    /// Insert a role. Names are unique per company.
    pub async fn insert_role(&self, role: Role) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state
            .roles
            .values()
            .any(|r| r.name == role.name && r.company_id == role.company_id)
        {
            return Err(DomainError::validation(
                "role_name",
                format!("role '{}' already exists in this company", role.name),
            ));
        }
        state.roles.insert(role.id, role);
        Ok(())
    }

    /// Attach a policy to a role. Idempotent.
    pub async fn attach_policy_to_role(
        &self,
        role_id: &RoleId,
        company_id: &CompanyId,
        policy_id: &PolicyId,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if !state
            .policies
            .get(policy_id)
            .is_some_and(|p| p.company_id == *company_id)
        {
            return Err(DomainError::not_found("Policy", policy_id));
        }
        let role = state
            .roles
            .get_mut(role_id)
            .filter(|r| r.company_id == *company_id)
            .ok_or_else(|| DomainError::not_found("Role", role_id))?;
        if !role.policy_ids.contains(policy_id) {
            role.policy_ids.push(*policy_id);
            role.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Attach a permission to a policy. Idempotent.
    pub async fn attach_permission_to_policy(
        &self,
        policy_id: &PolicyId,
        company_id: &CompanyId,
        permission_id: &PermissionId,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if !state.permissions.contains_key(permission_id) {
            return Err(DomainError::not_found("Permission", permission_id));
        }
        let policy = state
            .policies
            .get_mut(policy_id)
            .filter(|p| p.company_id == *company_id)
            .ok_or_else(|| DomainError::not_found("Policy", policy_id))?;
        if !policy.permission_ids.contains(permission_id) {
            policy.permission_ids.push(*permission_id);
            policy.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Insert an assignment, enforcing at most one active assignment per
    /// (user, role, company, project).
    pub async fn insert_assignment(&self, assignment: RoleAssignment) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if !state
            .roles
            .get(&assignment.role_id)
            .is_some_and(|r| r.company_id == assignment.company_id)
        {
            return Err(DomainError::not_found("Role", assignment.role_id));
        }
        if assignment.is_active
            && state.assignments.values().any(|a| {
                a.is_active
                    && a.user_id == assignment.user_id
                    && a.role_id == assignment.role_id
                    && a.company_id == assignment.company_id
                    && a.project_id == assignment.project_id
            })
        {
            return Err(DomainError::validation(
                "assignment",
                "an active assignment already exists for this user, role, and project",
            ));
        }
        state.assignments.insert(assignment.id, assignment);
        Ok(())
    }

    /// Activate or deactivate an assignment.
    pub async fn set_assignment_active(&self, id: &uuid::Uuid, active: bool) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let current = state
            .assignments
            .get(id)
            .ok_or_else(|| DomainError::not_found("RoleAssignment", id))?
            .clone();
        if active
            && !current.is_active
            && state.assignments.values().any(|a| {
                a.is_active
                    && a.id != current.id
                    && a.user_id == current.user_id
                    && a.role_id == current.role_id
                    && a.company_id == current.company_id
                    && a.project_id == current.project_id
            })
        {
            return Err(DomainError::validation(
                "assignment",
                "an active assignment already exists for this user, role, and project",
            ));
        }
        let assignment = state
            .assignments
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("RoleAssignment", id))?;
        assignment.is_active = active;
        assignment.updated_at = Utc::now();
        Ok(())
    }

    /// Change an assignment's expiry.
    pub async fn set_assignment_expiry(
        &self,
        id: &uuid::Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let assignment = state
            .assignments
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("RoleAssignment", id))?;
        assignment.expires_at = expires_at;
        assignment.updated_at = Utc::now();
        Ok(())
    }

    /// Activate or deactivate a role.
    pub async fn set_role_active(
        &self,
        role_id: &RoleId,
        company_id: &CompanyId,
        active: bool,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(role_id)
            .filter(|r| r.company_id == *company_id)
            .ok_or_else(|| DomainError::not_found("Role", role_id))?;
        role.is_active = active;
        role.updated_at = Utc::now();
        Ok(())
    }

    /// Activate or deactivate a policy.
    pub async fn set_policy_active(
        &self,
        policy_id: &PolicyId,
        company_id: &CompanyId,
        active: bool,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let policy = state
            .policies
            .get_mut(policy_id)
            .filter(|p| p.company_id == *company_id)
            .ok_or_else(|| DomainError::not_found("Policy", policy_id))?;
        policy.is_active = active;
        policy.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryRbacStore {
    async fn find_by_name(&self, name: &PermissionName) -> DomainResult<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.values().find(|p| p.name == *name).cloned())
    }

    async fn find_by_id(&self, id: &PermissionId) -> DomainResult<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> DomainResult<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.permissions.get(id).cloned())
            .collect())
    }

    async fn list(&self, limit: usize, offset: usize) -> DomainResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut all: Vec<Permission> = state.permissions.values().cloned().collect();
        all.sort_by(|a, b| a.name.canonical().cmp(&b.name.canonical()));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_by_service(&self, service: &str) -> DomainResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut matched: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| p.name.service() == service)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.canonical().cmp(&b.name.canonical()));
        Ok(matched)
    }

    async fn list_by_service_and_resource(
        &self,
        service: &str,
        resource_name: &str,
    ) -> DomainResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut matched: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| p.name.service() == service && p.name.resource_name() == resource_name)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.canonical().cmp(&b.name.canonical()));
        Ok(matched)
    }

    async fn count(&self) -> DomainResult<u64> {
        let state = self.state.read().await;
        Ok(state.permissions.len() as u64)
    }
}

#[async_trait]
impl PolicyRepository for InMemoryRbacStore {
    async fn find_by_id(
        &self,
        id: &PolicyId,
        company_id: &CompanyId,
    ) -> DomainResult<Option<Policy>> {
        let state = self.state.read().await;
        Ok(state
            .policies
            .get(id)
            .filter(|p| p.company_id == *company_id)
            .cloned())
    }

    async fn find_active_by_ids(
        &self,
        ids: &[PolicyId],
        company_id: &CompanyId,
    ) -> DomainResult<Vec<Policy>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.policies.get(id))
            .filter(|p| p.company_id == *company_id && p.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleRepository for InMemoryRbacStore {
    async fn find_by_id(&self, id: &RoleId, company_id: &CompanyId) -> DomainResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .get(id)
            .filter(|r| r.company_id == *company_id)
            .cloned())
    }

    async fn find_active_by_ids(
        &self,
        ids: &[RoleId],
        company_id: &CompanyId,
    ) -> DomainResult<Vec<Role>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.roles.get(id))
            .filter(|r| r.company_id == *company_id && r.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRbacStore {
    async fn find_eligible(
        &self,
        user_id: &UserId,
        company_id: &CompanyId,
        project_id: Option<&ProjectId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;
        let mut eligible: Vec<RoleAssignment> = state
            .assignments
            .values()
            .filter(|a| {
                a.user_id == *user_id
                    && a.company_id == *company_id
                    && a.is_eligible(project_id, now)
            })
            .cloned()
            .collect();
        eligible.sort_by_key(|a| a.granted_at);
        Ok(eligible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_domain::value_objects::Operation;

    fn permission(service: &str, resource: &str, operation: Operation) -> Permission {
        Permission::new(PermissionName::new(service, resource, operation), None)
    }

    #[tokio::test]
    async fn test_insert_permission_rejects_duplicate_name() {
        let store = InMemoryRbacStore::new();
        store
            .insert_permission(permission("storage", "files", Operation::Read))
            .await
            .unwrap();
        let duplicate = permission("storage", "files", Operation::Read);
        assert!(matches!(
            store.insert_permission(duplicate).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let store = InMemoryRbacStore::new();
        let p = permission("storage", "files", Operation::Delete);
        let name = p.name.clone();
        store.insert_permission(p.clone()).await.unwrap();

        let found = store.find_by_name(&name).await.unwrap();
        assert_eq!(found, Some(p));

        let missing = PermissionName::new("storage", "files", Operation::Create);
        assert_eq!(store.find_by_name(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_single_active_assignment_invariant() {
        let store = InMemoryRbacStore::new();
        let company = CompanyId::new();
        let role = Role::new("admin", "Admin", company);
        let role_id = role.id;
        store.insert_role(role).await.unwrap();

        let user = UserId::new();
        let first = RoleAssignment::new(user, role_id, company);
        store.insert_assignment(first.clone()).await.unwrap();

        let duplicate = RoleAssignment::new(user, role_id, company);
        assert!(matches!(
            store.insert_assignment(duplicate).await,
            Err(DomainError::Validation { .. })
        ));

        // A different project scope is a different tuple
        let scoped = RoleAssignment::new(user, role_id, company).with_project(ProjectId::new());
        store.insert_assignment(scoped).await.unwrap();

        // Deactivating the first allows a replacement
        store.set_assignment_active(&first.id, false).await.unwrap();
        let replacement = RoleAssignment::new(user, role_id, company);
        store.insert_assignment(replacement).await.unwrap();
    }

    #[tokio::test]
    async fn test_reactivation_checks_invariant() {
        let store = InMemoryRbacStore::new();
        let company = CompanyId::new();
        let role = Role::new("admin", "Admin", company);
        let role_id = role.id;
        store.insert_role(role).await.unwrap();

        let user = UserId::new();
        let first = RoleAssignment::new(user, role_id, company);
        store.insert_assignment(first.clone()).await.unwrap();
        store.set_assignment_active(&first.id, false).await.unwrap();

        let second = RoleAssignment::new(user, role_id, company);
        store.insert_assignment(second).await.unwrap();

        assert!(matches!(
            store.set_assignment_active(&first.id, true).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_eligible_orders_by_granted_at() {
        let store = InMemoryRbacStore::new();
        let company = CompanyId::new();
        let user = UserId::new();

        let role_a = Role::new("a", "A", company);
        let role_b = Role::new("b", "B", company);
        let (id_a, id_b) = (role_a.id, role_b.id);
        store.insert_role(role_a).await.unwrap();
        store.insert_role(role_b).await.unwrap();

        let now = Utc::now();
        let mut older = RoleAssignment::new(user, id_b, company);
        older.granted_at = now - chrono::Duration::days(2);
        let mut newer = RoleAssignment::new(user, id_a, company);
        newer.granted_at = now - chrono::Duration::days(1);

        store.insert_assignment(newer).await.unwrap();
        store.insert_assignment(older).await.unwrap();

        let eligible = store
            .find_eligible(&user, &company, None, now)
            .await
            .unwrap();
        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].role_id, id_b);
        assert_eq!(eligible[1].role_id, id_a);
    }
}
