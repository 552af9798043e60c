//! Error taxonomy shared by every warden crate
//!
//! Absence of a permission or of an eligible role is a verdict, never an
//! error: `decide` answers those cases with a denial reason. Only
//! malformed input, missing referenced entities, perimeter violations,
//! infrastructure failure, and retention-floor violations surface here.

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("Retention violation: {reason}")]
    RetentionViolation { reason: String },
}

impl DomainError {
    /// Shorthand for a validation failure
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a missing entity
    pub fn not_found(entity_type: impl Into<String>, id: impl std::fmt::Display) -> Self {
        DomainError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a storage failure
    pub fn storage(reason: impl Into<String>) -> Self {
        DomainError::Storage {
            reason: reason.into(),
        }
    }
}

impl From<warden_common::ValidationError> for DomainError {
    fn from(err: warden_common::ValidationError) -> Self {
        let field = match &err {
            warden_common::ValidationError::InvalidValue { field, .. } => field.clone(),
            warden_common::ValidationError::OutOfRange { field, .. } => field.clone(),
            warden_common::ValidationError::Required { field } => field.clone(),
        };
        DomainError::Validation {
            field,
            reason: err.to_string(),
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_conversion_keeps_field() {
        let err = warden_common::ValidationError::Required {
            field: "service".to_string(),
        };
        let domain: DomainError = err.into();
        assert!(matches!(
            domain,
            DomainError::Validation { ref field, .. } if field == "service"
        ));
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::not_found("Role", "abc");
        assert_eq!(err.to_string(), "Entity not found: Role with id abc");
    }
}
