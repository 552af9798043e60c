//! SQLite storage implementation
//!
//! UUIDs are stored as TEXT, timestamps as RFC 3339 TEXT. The
//! single-active-assignment invariant is backed by a partial unique
//! index in addition to the insert-time check, so concurrent writers
//! cannot race past it.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use warden_domain::{
    entities::{Permission, Policy, Role, RoleAssignment},
    errors::{DomainError, DomainResult},
    repositories::{AssignmentRepository, PermissionCatalog, PolicyRepository, RoleRepository},
    value_objects::{
        CompanyId, Operation, PermissionId, PermissionName, PolicyId, ProjectId, RoleId, ScopeType,
        UserId,
    },
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS permissions (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    service       TEXT NOT NULL,
    resource_name TEXT NOT NULL,
    operation     TEXT NOT NULL,
    description   TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_permissions_service_resource
    ON permissions (service, resource_name);

CREATE TABLE IF NOT EXISTS policies (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    display_name TEXT NOT NULL,
    description  TEXT,
    company_id   TEXT NOT NULL,
    priority     INTEGER NOT NULL DEFAULT 0,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (name, company_id)
);

CREATE TABLE IF NOT EXISTS roles (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    display_name TEXT NOT NULL,
    description  TEXT,
    company_id   TEXT NOT NULL,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (name, company_id)
);
CREATE INDEX IF NOT EXISTS ix_roles_company_active ON roles (company_id, is_active);

CREATE TABLE IF NOT EXISTS policy_permissions (
    policy_id     TEXT NOT NULL REFERENCES policies (id) ON DELETE CASCADE,
    permission_id TEXT NOT NULL REFERENCES permissions (id) ON DELETE CASCADE,
    PRIMARY KEY (policy_id, permission_id)
);

CREATE TABLE IF NOT EXISTS role_policies (
    role_id   TEXT NOT NULL REFERENCES roles (id) ON DELETE CASCADE,
    policy_id TEXT NOT NULL REFERENCES policies (id) ON DELETE CASCADE,
    PRIMARY KEY (role_id, policy_id)
);

CREATE TABLE IF NOT EXISTS user_roles (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    role_id    TEXT NOT NULL REFERENCES roles (id) ON DELETE CASCADE,
    company_id TEXT NOT NULL,
    project_id TEXT,
    scope_type TEXT NOT NULL DEFAULT 'direct',
    granted_by TEXT,
    granted_at TEXT NOT NULL,
    expires_at TEXT,
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_user_roles_user_company ON user_roles (user_id, company_id);
CREATE INDEX IF NOT EXISTS ix_user_roles_expires_at ON user_roles (expires_at);
CREATE UNIQUE INDEX IF NOT EXISTS ix_user_roles_unique_active
    ON user_roles (user_id, role_id, company_id, ifnull(project_id, ''))
    WHERE is_active = 1;
"#;

fn storage_err(err: sqlx::Error) -> DomainError {
    DomainError::storage(err.to_string())
}

fn parse_uuid(value: &str) -> DomainResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| DomainError::storage(format!("corrupt uuid '{value}': {e}")))
}

/// SQLite-backed RBAC store.
#[derive(Clone)]
pub struct SqliteRbacStore {
    pool: SqlitePool,
}

impl SqliteRbacStore {
    /// Open (creating if missing) a SQLite database at the given URL and
    /// apply the schema.
    pub async fn connect(url: &str) -> DomainResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(storage_err)?;
        Self::with_pool(pool).await
    }

    /// An isolated in-memory database, for tests and embedded use.
    pub async fn in_memory() -> DomainResult<Self> {
        // A pooled :memory: database must keep a single connection; each
        // new connection would otherwise see its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema.
    pub async fn with_pool(pool: SqlitePool) -> DomainResult<Self> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(storage_err)?;
        tracing::debug!("rbac schema applied");
        Ok(Self { pool })
    }

    /// Access the underlying pool (shared with the audit store in
    /// single-database deployments).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a catalog entry. Canonical names are globally unique.
    pub async fn insert_permission(&self, permission: Permission) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO permissions \
             (id, name, service, resource_name, operation, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(permission.id.to_string())
        .bind(permission.name.canonical())
        .bind(permission.name.service())
        .bind(permission.name.resource_name())
        .bind(permission.name.operation().as_str())
        .bind(&permission.description)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(DomainError::validation(
                "permission_name",
                format!("permission '{}' already exists", permission.name),
            )),
            Err(err) => Err(storage_err(err)),
        }
    }

    /// Insert a policy. Names are unique per company.
    pub async fn insert_policy(&self, policy: Policy) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO policies \
             (id, name, display_name, description, company_id, priority, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(policy.id.to_string())
        .bind(&policy.name)
        .bind(&policy.display_name)
        .bind(&policy.description)
        .bind(policy.company_id.to_string())
        .bind(policy.priority)
        .bind(policy.is_active)
        .bind(policy.created_at)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(DomainError::validation(
                "policy_name",
                format!("policy '{}' already exists in this company", policy.name),
            )),
            Err(err) => Err(storage_err(err)),
        }
    }

    /// Insert a role. Names are unique per company.
    pub async fn insert_role(&self, role: Role) -> DomainResult<()> {
        let result = sqlx::query(
            "INSERT INTO roles \
             (id, name, display_name, description, company_id, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(role.id.to_string())
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(&role.description)
        .bind(role.company_id.to_string())
        .bind(role.is_active)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(DomainError::validation(
                "role_name",
                format!("role '{}' already exists in this company", role.name),
            )),
            Err(err) => Err(storage_err(err)),
        }
    }

    /// Attach a policy to a role. Idempotent.
    pub async fn attach_policy_to_role(
        &self,
        role_id: &RoleId,
        company_id: &CompanyId,
        policy_id: &PolicyId,
    ) -> DomainResult<()> {
        if PolicyRepository::find_by_id(self, policy_id, company_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Policy", policy_id));
        }
        if RoleRepository::find_by_id(self, role_id, company_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Role", role_id));
        }
        sqlx::query("INSERT OR IGNORE INTO role_policies (role_id, policy_id) VALUES (?, ?)")
            .bind(role_id.to_string())
            .bind(policy_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Attach a permission to a policy. Idempotent.
    pub async fn attach_permission_to_policy(
        &self,
        policy_id: &PolicyId,
        company_id: &CompanyId,
        permission_id: &PermissionId,
    ) -> DomainResult<()> {
        if PermissionCatalog::find_by_id(self, permission_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Permission", permission_id));
        }
        if PolicyRepository::find_by_id(self, policy_id, company_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Policy", policy_id));
        }
        sqlx::query(
            "INSERT OR IGNORE INTO policy_permissions (policy_id, permission_id) VALUES (?, ?)",
        )
        .bind(policy_id.to_string())
        .bind(permission_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    /// Insert an assignment, enforcing at most one active assignment per
    /// (user, role, company, project).
    pub async fn insert_assignment(&self, assignment: RoleAssignment) -> DomainResult<()> {
        if RoleRepository::find_by_id(self, &assignment.role_id, &assignment.company_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Role", assignment.role_id));
        }
        let result = sqlx::query(
            "INSERT INTO user_roles \
             (id, user_id, role_id, company_id, project_id, scope_type, granted_by, granted_at, \
              expires_at, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(assignment.id.to_string())
        .bind(assignment.user_id.to_string())
        .bind(assignment.role_id.to_string())
        .bind(assignment.company_id.to_string())
        .bind(assignment.project_id.map(|p| p.to_string()))
        .bind(assignment.scope_type.as_str())
        .bind(assignment.granted_by.map(|u| u.to_string()))
        .bind(assignment.granted_at)
        .bind(assignment.expires_at)
        .bind(assignment.is_active)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(DomainError::validation(
                "assignment",
                "an active assignment already exists for this user, role, and project",
            )),
            Err(err) => Err(storage_err(err)),
        }
    }

    /// Activate or deactivate an assignment.
    pub async fn set_assignment_active(&self, id: &uuid::Uuid, active: bool) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE user_roles SET is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await;
        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(DomainError::not_found("RoleAssignment", id))
            }
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(DomainError::validation(
                "assignment",
                "an active assignment already exists for this user, role, and project",
            )),
            Err(err) => Err(storage_err(err)),
        }
    }

    /// Change an assignment's expiry.
    pub async fn set_assignment_expiry(
        &self,
        id: &uuid::Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        let done = sqlx::query("UPDATE user_roles SET expires_at = ?, updated_at = ? WHERE id = ?")
            .bind(expires_at)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("RoleAssignment", id));
        }
        Ok(())
    }

    /// Activate or deactivate a role.
    pub async fn set_role_active(
        &self,
        role_id: &RoleId,
        company_id: &CompanyId,
        active: bool,
    ) -> DomainResult<()> {
        let done =
            sqlx::query("UPDATE roles SET is_active = ?, updated_at = ? WHERE id = ? AND company_id = ?")
                .bind(active)
                .bind(Utc::now())
                .bind(role_id.to_string())
                .bind(company_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("Role", role_id));
        }
        Ok(())
    }

    /// Activate or deactivate a policy.
    pub async fn set_policy_active(
        &self,
        policy_id: &PolicyId,
        company_id: &CompanyId,
        active: bool,
    ) -> DomainResult<()> {
        let done = sqlx::query(
            "UPDATE policies SET is_active = ?, updated_at = ? WHERE id = ? AND company_id = ?",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(policy_id.to_string())
        .bind(company_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found("Policy", policy_id));
        }
        Ok(())
    }

    async fn policy_ids_for_roles(
        &self,
        role_ids: &[String],
    ) -> DomainResult<HashMap<String, Vec<PolicyId>>> {
        if role_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; role_ids.len()].join(", ");
        let sql = format!(
            "SELECT role_id, policy_id FROM role_policies WHERE role_id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for id in role_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        let mut grouped: HashMap<String, Vec<PolicyId>> = HashMap::new();
        for row in rows {
            let role_id: String = row.try_get("role_id").map_err(storage_err)?;
            let policy_id: String = row.try_get("policy_id").map_err(storage_err)?;
            grouped
                .entry(role_id)
                .or_default()
                .push(PolicyId::from_uuid(parse_uuid(&policy_id)?));
        }
        Ok(grouped)
    }

    async fn permission_ids_for_policies(
        &self,
        policy_ids: &[String],
    ) -> DomainResult<HashMap<String, Vec<PermissionId>>> {
        if policy_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; policy_ids.len()].join(", ");
        let sql = format!(
            "SELECT policy_id, permission_id FROM policy_permissions WHERE policy_id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for id in policy_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        let mut grouped: HashMap<String, Vec<PermissionId>> = HashMap::new();
        for row in rows {
            let policy_id: String = row.try_get("policy_id").map_err(storage_err)?;
            let permission_id: String = row.try_get("permission_id").map_err(storage_err)?;
            grouped
                .entry(policy_id)
                .or_default()
                .push(PermissionId::from_uuid(parse_uuid(&permission_id)?));
        }
        Ok(grouped)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().map(|db| db.kind()),
        Some(sqlx::error::ErrorKind::UniqueViolation)
    )
}

fn row_to_permission(row: &SqliteRow) -> DomainResult<Permission> {
    let id: String = row.try_get("id").map_err(storage_err)?;
    let service: String = row.try_get("service").map_err(storage_err)?;
    let resource_name: String = row.try_get("resource_name").map_err(storage_err)?;
    let operation: String = row.try_get("operation").map_err(storage_err)?;
    Ok(Permission {
        id: PermissionId::from_uuid(parse_uuid(&id)?),
        name: PermissionName::new(&service, &resource_name, Operation::parse(&operation)?),
        description: row.try_get("description").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
    })
}

fn row_to_policy(row: &SqliteRow, permission_ids: Vec<PermissionId>) -> DomainResult<Policy> {
    let id: String = row.try_get("id").map_err(storage_err)?;
    let company_id: String = row.try_get("company_id").map_err(storage_err)?;
    Ok(Policy {
        id: PolicyId::from_uuid(parse_uuid(&id)?),
        name: row.try_get("name").map_err(storage_err)?,
        display_name: row.try_get("display_name").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        company_id: CompanyId::from_uuid(parse_uuid(&company_id)?),
        priority: row.try_get("priority").map_err(storage_err)?,
        is_active: row.try_get("is_active").map_err(storage_err)?,
        permission_ids,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
    })
}

fn row_to_role(row: &SqliteRow, policy_ids: Vec<PolicyId>) -> DomainResult<Role> {
    let id: String = row.try_get("id").map_err(storage_err)?;
    let company_id: String = row.try_get("company_id").map_err(storage_err)?;
    Ok(Role {
        id: RoleId::from_uuid(parse_uuid(&id)?),
        name: row.try_get("name").map_err(storage_err)?,
        display_name: row.try_get("display_name").map_err(storage_err)?,
        description: row.try_get("description").map_err(storage_err)?,
        company_id: CompanyId::from_uuid(parse_uuid(&company_id)?),
        is_active: row.try_get("is_active").map_err(storage_err)?,
        policy_ids,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
    })
}

fn row_to_assignment(row: &SqliteRow) -> DomainResult<RoleAssignment> {
    let id: String = row.try_get("id").map_err(storage_err)?;
    let user_id: String = row.try_get("user_id").map_err(storage_err)?;
    let role_id: String = row.try_get("role_id").map_err(storage_err)?;
    let company_id: String = row.try_get("company_id").map_err(storage_err)?;
    let project_id: Option<String> = row.try_get("project_id").map_err(storage_err)?;
    let scope_type: String = row.try_get("scope_type").map_err(storage_err)?;
    let granted_by: Option<String> = row.try_get("granted_by").map_err(storage_err)?;
    Ok(RoleAssignment {
        id: parse_uuid(&id)?,
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        role_id: RoleId::from_uuid(parse_uuid(&role_id)?),
        company_id: CompanyId::from_uuid(parse_uuid(&company_id)?),
        project_id: match project_id {
            Some(p) => Some(ProjectId::from_uuid(parse_uuid(&p)?)),
            None => None,
        },
        scope_type: ScopeType::from_str(&scope_type)
            .ok_or_else(|| DomainError::storage(format!("corrupt scope_type '{scope_type}'")))?,
        granted_by: match granted_by {
            Some(u) => Some(UserId::from_uuid(parse_uuid(&u)?)),
            None => None,
        },
        granted_at: row.try_get("granted_at").map_err(storage_err)?,
        expires_at: row.try_get("expires_at").map_err(storage_err)?,
        is_active: row.try_get("is_active").map_err(storage_err)?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
        updated_at: row.try_get("updated_at").map_err(storage_err)?,
    })
}

#[async_trait]
impl PermissionCatalog for SqliteRbacStore {
    async fn find_by_name(&self, name: &PermissionName) -> DomainResult<Option<Permission>> {
        let row = sqlx::query("SELECT * FROM permissions WHERE name = ?")
            .bind(name.canonical())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_permission).transpose()
    }

    async fn find_by_id(&self, id: &PermissionId) -> DomainResult<Option<Permission>> {
        let row = sqlx::query("SELECT * FROM permissions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_permission).transpose()
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> DomainResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM permissions WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        rows.iter().map(row_to_permission).collect()
    }

    async fn list(&self, limit: usize, offset: usize) -> DomainResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT * FROM permissions ORDER BY name LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_permission).collect()
    }

    async fn list_by_service(&self, service: &str) -> DomainResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT * FROM permissions WHERE service = ? ORDER BY name")
            .bind(service)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_permission).collect()
    }

    async fn list_by_service_and_resource(
        &self,
        service: &str,
        resource_name: &str,
    ) -> DomainResult<Vec<Permission>> {
        let rows = sqlx::query(
            "SELECT * FROM permissions WHERE service = ? AND resource_name = ? ORDER BY name",
        )
        .bind(service)
        .bind(resource_name)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_permission).collect()
    }

    async fn count(&self) -> DomainResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM permissions")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let total: i64 = row.try_get("total").map_err(storage_err)?;
        Ok(total as u64)
    }
}

#[async_trait]
impl PolicyRepository for SqliteRbacStore {
    async fn find_by_id(
        &self,
        id: &PolicyId,
        company_id: &CompanyId,
    ) -> DomainResult<Option<Policy>> {
        let row = sqlx::query("SELECT * FROM policies WHERE id = ? AND company_id = ?")
            .bind(id.to_string())
            .bind(company_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        match row {
            Some(row) => {
                let key = id.to_string();
                let mut permissions = self.permission_ids_for_policies(&[key.clone()]).await?;
                Ok(Some(row_to_policy(
                    &row,
                    permissions.remove(&key).unwrap_or_default(),
                )?))
            }
            None => Ok(None),
        }
    }

    async fn find_active_by_ids(
        &self,
        ids: &[PolicyId],
        company_id: &CompanyId,
    ) -> DomainResult<Vec<Policy>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM policies WHERE company_id = ? AND is_active = 1 AND id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(company_id.to_string());
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;

        let keys: Vec<String> = rows
            .iter()
            .map(|row| row.try_get::<String, _>("id").map_err(storage_err))
            .collect::<DomainResult<_>>()?;
        let mut permissions = self.permission_ids_for_policies(&keys).await?;

        rows.iter()
            .zip(keys)
            .map(|(row, key)| row_to_policy(row, permissions.remove(&key).unwrap_or_default()))
            .collect()
    }
}

#[async_trait]
impl RoleRepository for SqliteRbacStore {
    async fn find_by_id(&self, id: &RoleId, company_id: &CompanyId) -> DomainResult<Option<Role>> {
        let row = sqlx::query("SELECT * FROM roles WHERE id = ? AND company_id = ?")
            .bind(id.to_string())
            .bind(company_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        match row {
            Some(row) => {
                let key = id.to_string();
                let mut policies = self.policy_ids_for_roles(&[key.clone()]).await?;
                Ok(Some(row_to_role(
                    &row,
                    policies.remove(&key).unwrap_or_default(),
                )?))
            }
            None => Ok(None),
        }
    }

    async fn find_active_by_ids(
        &self,
        ids: &[RoleId],
        company_id: &CompanyId,
    ) -> DomainResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM roles WHERE company_id = ? AND is_active = 1 AND id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(company_id.to_string());
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;

        let keys: Vec<String> = rows
            .iter()
            .map(|row| row.try_get::<String, _>("id").map_err(storage_err))
            .collect::<DomainResult<_>>()?;
        let mut policies = self.policy_ids_for_roles(&keys).await?;

        rows.iter()
            .zip(keys)
            .map(|(row, key)| row_to_role(row, policies.remove(&key).unwrap_or_default()))
            .collect()
    }
}

#[async_trait]
impl AssignmentRepository for SqliteRbacStore {
    async fn find_eligible(
        &self,
        user_id: &UserId,
        company_id: &CompanyId,
        project_id: Option<&ProjectId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RoleAssignment>> {
        let project = project_id.map(|p| p.to_string());
        let rows = sqlx::query(
            "SELECT * FROM user_roles \
             WHERE user_id = ? AND company_id = ? AND is_active = 1 \
               AND (expires_at IS NULL OR expires_at > ?) \
               AND (? IS NULL OR project_id IS NULL OR project_id = ?) \
             ORDER BY granted_at",
        )
        .bind(user_id.to_string())
        .bind(company_id.to_string())
        .bind(now)
        .bind(&project)
        .bind(&project)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_assignment).collect()
    }
}
