//! Authorization decision engine and permission aggregator
//!
//! `DecisionEngine::decide` answers "may this user perform this operation
//! on this resource of this service, optionally within this project?" by
//! traversing Assignment → Role → Policy → Permission, and hands every
//! verdict, granted or denied, to the audit trail before returning.
//!
//! `PermissionAggregator` reuses the identical eligibility traversal,
//! without a target permission, to flatten everything a user can
//! currently do.
//!
//! Absence of a permission or of an eligible role is a verdict, never an
//! error; only infrastructure failure surfaces as `Err`.

pub mod aggregator;
pub mod decision;
pub mod di;
pub mod request;

pub use aggregator::{
    EffectivePermissions, PermissionAggregator, PermissionView, PolicyView, RoleGrant,
};
pub use decision::{AccessDecision, DecisionEngine, MatchedRole};
pub use request::AccessRequest;
