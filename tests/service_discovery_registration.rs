/// Cross-crate service discovery: every feature crate's factory is
/// collected through the shared inventory registry once the crates are
/// linked together.
use warden_common::di::{collect_all_services, list_discovered_factories};
use warden_engine::{DecisionEngine, PermissionAggregator};

#[test]
fn test_all_factories_discovered() {
    let factories = list_discovered_factories();
    for expected in ["storage", "audit", "engine"] {
        assert!(
            factories.contains(&expected),
            "factory '{expected}' should be registered, got {factories:?}"
        );
    }
}

#[test]
fn test_collected_services_downcast() {
    let services = collect_all_services();
    assert!(services
        .iter()
        .any(|s| s.downcast::<DecisionEngine>().is_some()));
    assert!(services
        .iter()
        .any(|s| s.downcast::<PermissionAggregator>().is_some()));
}
