//! Dependency injection support for warden-engine

use std::sync::Arc;

use warden_audit::AuditRecorder;
use warden_common::di::{ServiceEntry, ServiceFactory};
use warden_storage::InMemoryRbacStore;

use crate::{DecisionEngine, PermissionAggregator};

inventory::submit! {
    ServiceFactory::new("engine", create_engine_services)
}

fn create_engine_services() -> Vec<ServiceEntry> {
    let store = InMemoryRbacStore::new();
    let engine = DecisionEngine::with_store(store.clone(), AuditRecorder::default());
    let aggregator = PermissionAggregator::with_store(store);
    vec![
        ServiceEntry::new::<DecisionEngine>(Arc::new(engine)),
        ServiceEntry::new::<PermissionAggregator>(Arc::new(aggregator)),
    ]
}
