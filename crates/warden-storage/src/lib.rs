//! Storage backends for the warden RBAC graph
//!
//! Implements the `warden-domain` repository contracts twice: an
//! in-memory store for tests and embedded use, and a SQLite store for
//! durable deployments. Both backends expose the same management
//! mutators used by the external seeding/management layer; the
//! at-most-one-active-assignment invariant is enforced at insert time in
//! both.

pub mod di;
pub mod memory;
pub mod sqlite;

pub use memory::InMemoryRbacStore;
pub use sqlite::SqliteRbacStore;
