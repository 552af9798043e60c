//! Compliance audit trail for warden access decisions
//!
//! Every access decision is recorded through a dual-write: a durable
//! store insert that must succeed before the decision is returned, and a
//! best-effort append to a structured log stream for long-term retention.
//! The two failure policies are enforced in exactly one place
//! (`AuditRecorder::record`), so a stream failure can never fail a
//! request and a store failure can never be silently swallowed.
//!
//! Query, statistics, and retention-bounded purge live on
//! `AuditService`; all of them are scoped to the caller's company.

pub mod di;
pub mod models;
pub mod query;
pub mod recorder;
pub mod service;
pub mod statistics;
pub mod store;
pub mod stream;

pub use models::{AccessRecord, AccessStatistics, RequestContext};
pub use query::{Pagination, RecordFilter};
pub use recorder::AuditRecorder;
pub use service::{AuditService, MIN_RETENTION_DAYS};
pub use store::{AuditStore, MemoryAuditStore, SqliteAuditStore};
pub use stream::{AuditStream, JsonLinesAuditStream, TracingAuditStream};
