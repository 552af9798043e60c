//! Dependency injection support for warden-audit

use std::sync::Arc;

use warden_common::di::{ServiceEntry, ServiceFactory};

use crate::recorder::AuditRecorder;
use crate::service::AuditService;

inventory::submit! {
    ServiceFactory::new("audit", create_audit_services)
}

fn create_audit_services() -> Vec<ServiceEntry> {
    let recorder = AuditRecorder::default();
    let service = AuditService::new(recorder.store());
    vec![
        ServiceEntry::new::<AuditRecorder>(Arc::new(recorder)),
        ServiceEntry::new::<AuditService>(Arc::new(service)),
    ]
}
