//! Audit record querying and filtering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_domain::{
    errors::{DomainError, DomainResult},
    value_objects::{CompanyId, ProjectId, UserId},
};

use crate::models::AccessRecord;

/// Hard cap on page size
pub const MAX_PAGE_SIZE: usize = 100;

/// Default page size when the caller does not specify one
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Filter criteria for audit record queries.
///
/// Every field is optional; an empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub user_id: Option<UserId>,
    pub company_id: Option<CompanyId>,
    pub project_id: Option<ProjectId>,
    pub service: Option<String>,
    pub resource_name: Option<String>,
    pub operation: Option<String>,
    pub access_granted: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn with_resource(mut self, resource_name: &str) -> Self {
        self.resource_name = Some(resource_name.to_string());
        self
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_granted(mut self, access_granted: bool) -> Self {
        self.access_granted = Some(access_granted);
        self
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Check whether a record matches this filter
    pub fn matches(&self, record: &AccessRecord) -> bool {
        if let Some(user_id) = &self.user_id {
            if record.user_id != *user_id {
                return false;
            }
        }
        if let Some(company_id) = &self.company_id {
            if record.company_id != *company_id {
                return false;
            }
        }
        if let Some(project_id) = &self.project_id {
            if record.project_id.as_ref() != Some(project_id) {
                return false;
            }
        }
        if let Some(service) = &self.service {
            if record.service != *service {
                return false;
            }
        }
        if let Some(resource_name) = &self.resource_name {
            if record.resource_name != *resource_name {
                return false;
            }
        }
        if let Some(operation) = &self.operation {
            if record.operation != *operation {
                return false;
            }
        }
        if let Some(access_granted) = self.access_granted {
            if record.access_granted != access_granted {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Pagination parameters, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    pub fn first_page(page_size: usize) -> Self {
        Self { page: 1, page_size }
    }

    /// Page size after applying the hard cap
    pub fn effective_size(&self) -> usize {
        self.page_size.min(MAX_PAGE_SIZE)
    }

    /// Offset of the first record on this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.effective_size()
    }

    /// Reject zero page or page size
    pub fn validate(&self) -> DomainResult<()> {
        if self.page == 0 {
            return Err(DomainError::validation("page", "pages are 1-indexed"));
        }
        if self.page_size == 0 {
            return Err(DomainError::validation(
                "page_size",
                "page_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
