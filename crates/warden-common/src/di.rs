//! Service registration types for cross-crate auto-discovery
//!
//! Each feature crate creates its services and returns them as
//! `ServiceEntry` items from a `ServiceFactory` submitted via the
//! `inventory` crate. The embedding application collects all entries at
//! startup and registers them in its container.
//!
//! ## Usage
//!
//! In a feature crate (e.g., warden-audit):
//!
//! ```rust,ignore
//! use warden_common::di::{ServiceEntry, ServiceFactory};
//! use std::sync::Arc;
//!
//! inventory::submit! {
//!     ServiceFactory::new("audit", create_audit_services)
//! }
//!
//! fn create_audit_services() -> Vec<ServiceEntry> {
//!     vec![ServiceEntry::new::<AuditRecorder>(Arc::new(AuditRecorder::default()))]
//! }
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::{debug, info};

/// A service entry containing a type-erased service instance.
pub struct ServiceEntry {
    /// The TypeId of the service (used as registration key)
    pub type_id: TypeId,

    /// Human-readable type name for debugging
    pub type_name: &'static str,

    /// The service instance (type-erased)
    pub instance: Arc<dyn Any + Send + Sync>,
}

impl ServiceEntry {
    /// Create a new service entry for a concrete type
    pub fn new<T: Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            instance: instance as Arc<dyn Any + Send + Sync>,
        }
    }

    /// Downcast the entry back to a concrete service type
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// A service factory that creates services for a module.
///
/// Each crate submits a `ServiceFactory` via `inventory::submit!`. The
/// factory function is called during container initialization.
pub struct ServiceFactory {
    /// Name of the service group (e.g., "storage", "engine", "audit")
    pub name: &'static str,

    /// Factory function that creates and returns services
    pub factory_fn: fn() -> Vec<ServiceEntry>,

    /// Priority for registration order (lower = earlier, default = 100)
    pub priority: u32,
}

impl ServiceFactory {
    /// Create a new service factory with default priority
    pub const fn new(name: &'static str, factory_fn: fn() -> Vec<ServiceEntry>) -> Self {
        Self {
            name,
            factory_fn,
            priority: 100,
        }
    }

    /// Create a new service factory with custom priority
    pub const fn with_priority(
        name: &'static str,
        factory_fn: fn() -> Vec<ServiceEntry>,
        priority: u32,
    ) -> Self {
        Self {
            name,
            factory_fn,
            priority,
        }
    }
}

inventory::collect!(ServiceFactory);

/// Collect all services from discovered factories.
///
/// Iterates over every `ServiceFactory` submitted across all linked crates
/// and calls its factory function. Services are created in priority order
/// (lower priority value = earlier).
pub fn collect_all_services() -> Vec<ServiceEntry> {
    let mut factories: Vec<&ServiceFactory> = inventory::iter::<ServiceFactory>().collect();
    factories.sort_by_key(|f| f.priority);

    info!(
        "Discovered {} service factories via inventory",
        factories.len()
    );

    let mut all_services = Vec::new();
    for factory in factories {
        let services = (factory.factory_fn)();
        debug!(
            "Factory '{}' created {} services",
            factory.name,
            services.len()
        );
        all_services.extend(services);
    }

    all_services
}

/// List the names of all discovered service factories.
pub fn list_discovered_factories() -> Vec<&'static str> {
    inventory::iter::<ServiceFactory>()
        .map(|f| f.name)
        .collect()
}
