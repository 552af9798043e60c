//! Shared infrastructure for the warden workspace
//!
//! Provides the cross-crate service registration mechanism, the common
//! validation traits, and logging initialization. This crate depends on no
//! other warden crate, making it safe for every crate to depend on.

pub mod di;
pub mod logging;
pub mod validation;

pub use di::{ServiceEntry, ServiceFactory};
pub use logging::{init_logging, LogLevel, LogOptions};
pub use validation::{Validatable, ValidationError, Validator};
