//! Durable audit record stores

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::sync::RwLock;
use uuid::Uuid;

use warden_domain::{
    errors::{DomainError, DomainResult},
    value_objects::{AccessReason, CompanyId, ProjectId, UserId},
};

use crate::models::AccessRecord;
use crate::query::{Pagination, RecordFilter};

/// Durable storage for audit records.
///
/// Records are append-only: there is no update operation, and deletion
/// happens only through `purge`.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert one record. This is the synchronous, required half of the
    /// dual-write; failures must propagate.
    async fn insert(&self, record: &AccessRecord) -> DomainResult<()>;

    /// Fetch one page of matching records, newest first, along with the
    /// total number of matches.
    async fn fetch_page(
        &self,
        filter: &RecordFilter,
        pagination: &Pagination,
    ) -> DomainResult<(Vec<AccessRecord>, u64)>;

    /// Fetch every matching record, newest first
    async fn fetch_all(&self, filter: &RecordFilter) -> DomainResult<Vec<AccessRecord>>;

    /// Count matching records
    async fn count(&self, filter: &RecordFilter) -> DomainResult<u64>;

    /// Fetch one record by id
    async fn find_by_id(&self, id: &Uuid) -> DomainResult<Option<AccessRecord>>;

    /// Hard-delete records strictly older than `before`, optionally
    /// limited to one company. Returns the number of deleted records.
    async fn purge(&self, before: DateTime<Utc>, company_id: Option<&CompanyId>)
        -> DomainResult<u64>;
}

/// In-memory audit store for testing and embedded use.
#[derive(Clone, Default)]
pub struct MemoryAuditStore {
    records: Arc<RwLock<Vec<AccessRecord>>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(records: &mut [AccessRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn insert(&self, record: &AccessRecord) -> DomainResult<()> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn fetch_page(
        &self,
        filter: &RecordFilter,
        pagination: &Pagination,
    ) -> DomainResult<(Vec<AccessRecord>, u64)> {
        let records = self.records.read().await;
        let mut matched: Vec<AccessRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut matched);
        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.effective_size())
            .collect();
        Ok((page, total))
    }

    async fn fetch_all(&self, filter: &RecordFilter) -> DomainResult<Vec<AccessRecord>> {
        let records = self.records.read().await;
        let mut matched: Vec<AccessRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut matched);
        Ok(matched)
    }

    async fn count(&self, filter: &RecordFilter) -> DomainResult<u64> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn find_by_id(&self, id: &Uuid) -> DomainResult<Option<AccessRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == *id).cloned())
    }

    async fn purge(
        &self,
        before: DateTime<Utc>,
        company_id: Option<&CompanyId>,
    ) -> DomainResult<u64> {
        let mut records = self.records.write().await;
        let before_len = records.len();
        records.retain(|r| {
            let in_scope = company_id.is_none_or(|c| r.company_id == *c);
            !(in_scope && r.created_at < before)
        });
        Ok((before_len - records.len()) as u64)
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS access_logs (
    id             TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    company_id     TEXT NOT NULL,
    project_id     TEXT,
    service        TEXT NOT NULL,
    resource_name  TEXT NOT NULL,
    operation      TEXT NOT NULL,
    access_granted INTEGER NOT NULL,
    reason         TEXT NOT NULL,
    resource_id    TEXT,
    ip_address     TEXT,
    user_agent     TEXT,
    context        TEXT NOT NULL DEFAULT '{}',
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_access_logs_user ON access_logs (user_id);
CREATE INDEX IF NOT EXISTS ix_access_logs_company ON access_logs (company_id);
CREATE INDEX IF NOT EXISTS ix_access_logs_granted ON access_logs (access_granted);
CREATE INDEX IF NOT EXISTS ix_access_logs_created_at ON access_logs (created_at);
CREATE INDEX IF NOT EXISTS ix_access_logs_project ON access_logs (project_id);
"#;

fn storage_err(err: sqlx::Error) -> DomainError {
    DomainError::storage(err.to_string())
}

fn parse_uuid(value: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| DomainError::storage(format!("corrupt uuid '{value}': {e}")))
}

enum BindValue {
    Text(String),
    Bool(bool),
    Time(DateTime<Utc>),
}

fn filter_conditions(filter: &RecordFilter) -> (Vec<&'static str>, Vec<BindValue>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();
    if let Some(user_id) = &filter.user_id {
        conditions.push("user_id = ?");
        binds.push(BindValue::Text(user_id.to_string()));
    }
    if let Some(company_id) = &filter.company_id {
        conditions.push("company_id = ?");
        binds.push(BindValue::Text(company_id.to_string()));
    }
    if let Some(project_id) = &filter.project_id {
        conditions.push("project_id = ?");
        binds.push(BindValue::Text(project_id.to_string()));
    }
    if let Some(service) = &filter.service {
        conditions.push("service = ?");
        binds.push(BindValue::Text(service.clone()));
    }
    if let Some(resource_name) = &filter.resource_name {
        conditions.push("resource_name = ?");
        binds.push(BindValue::Text(resource_name.clone()));
    }
    if let Some(operation) = &filter.operation {
        conditions.push("operation = ?");
        binds.push(BindValue::Text(operation.clone()));
    }
    if let Some(access_granted) = filter.access_granted {
        conditions.push("access_granted = ?");
        binds.push(BindValue::Bool(access_granted));
    }
    if let Some(from) = filter.from {
        conditions.push("created_at >= ?");
        binds.push(BindValue::Time(from));
    }
    if let Some(to) = filter.to {
        conditions.push("created_at <= ?");
        binds.push(BindValue::Time(to));
    }
    (conditions, binds)
}

fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    binds: &'q [BindValue],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for value in binds {
        query = match value {
            BindValue::Text(text) => query.bind(text),
            BindValue::Bool(flag) => query.bind(*flag),
            BindValue::Time(time) => query.bind(*time),
        };
    }
    query
}

fn row_to_record(row: &SqliteRow) -> DomainResult<AccessRecord> {
    let id: String = row.try_get("id").map_err(storage_err)?;
    let user_id: String = row.try_get("user_id").map_err(storage_err)?;
    let company_id: String = row.try_get("company_id").map_err(storage_err)?;
    let project_id: Option<String> = row.try_get("project_id").map_err(storage_err)?;
    let reason: String = row.try_get("reason").map_err(storage_err)?;
    let context: String = row.try_get("context").map_err(storage_err)?;
    Ok(AccessRecord {
        id: parse_uuid(&id)?,
        user_id: UserId::from_uuid(parse_uuid(&user_id)?),
        company_id: CompanyId::from_uuid(parse_uuid(&company_id)?),
        project_id: match project_id {
            Some(p) => Some(ProjectId::from_uuid(parse_uuid(&p)?)),
            None => None,
        },
        service: row.try_get("service").map_err(storage_err)?,
        resource_name: row.try_get("resource_name").map_err(storage_err)?,
        operation: row.try_get("operation").map_err(storage_err)?,
        access_granted: row.try_get("access_granted").map_err(storage_err)?,
        reason: AccessReason::from_str(&reason)
            .ok_or_else(|| DomainError::storage(format!("corrupt reason '{reason}'")))?,
        resource_id: row.try_get("resource_id").map_err(storage_err)?,
        ip_address: row.try_get("ip_address").map_err(storage_err)?,
        user_agent: row.try_get("user_agent").map_err(storage_err)?,
        context: serde_json::from_str(&context)
            .map_err(|e| DomainError::storage(format!("corrupt context blob: {e}")))?,
        created_at: row.try_get("created_at").map_err(storage_err)?,
    })
}

/// SQLite-backed audit store.
#[derive(Clone)]
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
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
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool (shared with the RBAC store in
    /// single-database deployments) and apply the schema.
    pub async fn with_pool(pool: SqlitePool) -> DomainResult<Self> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(storage_err)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn insert(&self, record: &AccessRecord) -> DomainResult<()> {
        let context = serde_json::to_string(&record.context)
            .map_err(|e| DomainError::storage(format!("context blob not serializable: {e}")))?;
        sqlx::query(
            "INSERT INTO access_logs \
             (id, user_id, company_id, project_id, service, resource_name, operation, \
              access_granted, reason, resource_id, ip_address, user_agent, context, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.company_id.to_string())
        .bind(record.project_id.map(|p| p.to_string()))
        .bind(&record.service)
        .bind(&record.resource_name)
        .bind(&record.operation)
        .bind(record.access_granted)
        .bind(record.reason.as_str())
        .bind(&record.resource_id)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(context)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn fetch_page(
        &self,
        filter: &RecordFilter,
        pagination: &Pagination,
    ) -> DomainResult<(Vec<AccessRecord>, u64)> {
        let total = self.count(filter).await?;

        let (conditions, binds) = filter_conditions(filter);
        let sql = format!(
            "SELECT * FROM access_logs{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            where_clause(&conditions)
        );
        let query = bind_all(sqlx::query(&sql), &binds)
            .bind(pagination.effective_size() as i64)
            .bind(pagination.offset() as i64);
        let rows = query.fetch_all(&self.pool).await.map_err(storage_err)?;
        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok((records, total))
    }

    async fn fetch_all(&self, filter: &RecordFilter) -> DomainResult<Vec<AccessRecord>> {
        let (conditions, binds) = filter_conditions(filter);
        let sql = format!(
            "SELECT * FROM access_logs{} ORDER BY created_at DESC, id DESC",
            where_clause(&conditions)
        );
        let rows = bind_all(sqlx::query(&sql), &binds)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self, filter: &RecordFilter) -> DomainResult<u64> {
        let (conditions, binds) = filter_conditions(filter);
        let sql = format!(
            "SELECT COUNT(*) AS total FROM access_logs{}",
            where_clause(&conditions)
        );
        let row = bind_all(sqlx::query(&sql), &binds)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let total: i64 = row.try_get("total").map_err(storage_err)?;
        Ok(total as u64)
    }

    async fn find_by_id(&self, id: &Uuid) -> DomainResult<Option<AccessRecord>> {
        let row = sqlx::query("SELECT * FROM access_logs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn purge(
        &self,
        before: DateTime<Utc>,
        company_id: Option<&CompanyId>,
    ) -> DomainResult<u64> {
        let done = match company_id {
            Some(company_id) => {
                sqlx::query("DELETE FROM access_logs WHERE created_at < ? AND company_id = ?")
                    .bind(before)
                    .bind(company_id.to_string())
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query("DELETE FROM access_logs WHERE created_at < ?")
                    .bind(before)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(storage_err)?;
        Ok(done.rows_affected())
    }
}
