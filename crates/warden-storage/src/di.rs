//! Dependency injection support for warden-storage

use std::sync::Arc;

use warden_common::di::{ServiceEntry, ServiceFactory};

use crate::InMemoryRbacStore;

inventory::submit! {
    ServiceFactory::with_priority("storage", create_storage_services, 50)
}

fn create_storage_services() -> Vec<ServiceEntry> {
    vec![ServiceEntry::new::<InMemoryRbacStore>(Arc::new(
        InMemoryRbacStore::new(),
    ))]
}

#[cfg(test)]
mod tests {
    use warden_common::di::list_discovered_factories;

    #[test]
    fn test_storage_factory_registered() {
        let factories = list_discovered_factories();
        assert!(factories.contains(&"storage"), "Factory should be registered");
    }
}
