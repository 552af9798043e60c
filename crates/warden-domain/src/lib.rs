//! Core domain model for the warden authorization system
//!
//! Defines the RBAC entity graph (Permission, Policy, Role, RoleAssignment),
//! the value objects shared across the workspace, the repository contracts
//! implemented by storage backends, and the error taxonomy used by every
//! warden crate.
//!
//! The entity graph is modeled as owned id-collections: a Role owns a set
//! of Policy ids, a Policy owns a set of Permission ids. Storage backends
//! resolve ids through the repository traits; no live object graph is held
//! in memory.

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod value_objects;

pub use entities::{Permission, Policy, Role, RoleAssignment};
pub use errors::{DomainError, DomainResult};
pub use repositories::{
    AssignmentRepository, PermissionCatalog, PolicyRepository, RoleRepository,
};
pub use value_objects::{
    AccessReason, CompanyId, IdentityContext, Operation, PermissionId, PermissionName, PolicyId,
    ProjectId, RoleId, ScopeType, UserId,
};
