//! Access check request types

use serde::{Deserialize, Serialize};

use warden_common::validation::{IdentifierValidator, Validatable, ValidationError, Validator};
use warden_domain::value_objects::{Operation, PermissionName, ProjectId};

const IDENTIFIER_MAX_LENGTH: usize = 50;

/// One access check: "may I perform `operation` on `resource_name` of
/// `service`, optionally within `project_id`?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub service: String,
    pub resource_name: String,
    pub operation: Operation,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Specific resource instance, echoed into the audit record
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Opaque caller-supplied metadata, stored with the audit record and
    /// never interpreted
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

impl AccessRequest {
    pub fn new(service: &str, resource_name: &str, operation: Operation) -> Self {
        Self {
            service: service.to_string(),
            resource_name: resource_name.to_string(),
            operation,
            project_id: None,
            resource_id: None,
            context: None,
        }
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Canonical name of the permission this request targets
    pub fn permission_name(&self) -> PermissionName {
        PermissionName::new(&self.service, &self.resource_name, self.operation.clone())
    }
}

impl Validatable for AccessRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        IdentifierValidator::new("service", IDENTIFIER_MAX_LENGTH).validate(self.service.as_str())?;
        IdentifierValidator::new("resource_name", IDENTIFIER_MAX_LENGTH)
            .validate(self.resource_name.as_str())?;
        Ok(())
    }
}
