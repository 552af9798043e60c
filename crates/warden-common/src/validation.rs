//! Validation traits and common validators
//!
//! Provides a unified validation interface so request types across the
//! workspace validate themselves the same way.

use std::ops::RangeInclusive;
use thiserror::Error;

/// Validation error with context
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Value out of range for {field}: expected {expected}, got {actual}")]
    OutOfRange {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Required field missing: {field}")]
    Required { field: String },
}

/// Trait for types that can be validated
pub trait Validatable {
    /// Validate the instance, returning Ok(()) if valid
    fn validate(&self) -> Result<(), ValidationError>;

    /// Check if the instance is valid without returning the error details
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Trait for validators that can check values
pub trait Validator<T: ?Sized> {
    /// Validate a value
    fn validate(&self, value: &T) -> Result<(), ValidationError>;
}

/// Validator for identifier tokens such as service and resource names.
///
/// Accepts non-empty lowercase alphanumeric tokens with `_` and `-`,
/// bounded in length.
pub struct IdentifierValidator {
    field: &'static str,
    max_length: usize,
}

impl IdentifierValidator {
    pub fn new(field: &'static str, max_length: usize) -> Self {
        Self { field, max_length }
    }
}

impl Validator<str> for IdentifierValidator {
    fn validate(&self, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: self.field.to_string(),
            });
        }
        if value.len() > self.max_length {
            return Err(ValidationError::OutOfRange {
                field: self.field.to_string(),
                expected: format!("at most {} characters", self.max_length),
                actual: format!("{} characters", value.len()),
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidValue {
                field: self.field.to_string(),
                message: "must contain only lowercase letters, digits, '_' or '-'".to_string(),
            });
        }
        Ok(())
    }
}

/// Validator for bounded collection sizes (e.g., batch requests).
pub struct BatchSizeValidator {
    field: &'static str,
    range: RangeInclusive<usize>,
}

impl BatchSizeValidator {
    pub fn new(field: &'static str, min: usize, max: usize) -> Self {
        Self {
            field,
            range: min..=max,
        }
    }
}

impl Validator<usize> for BatchSizeValidator {
    fn validate(&self, value: &usize) -> Result<(), ValidationError> {
        if !self.range.contains(value) {
            return Err(ValidationError::OutOfRange {
                field: self.field.to_string(),
                expected: format!("{} to {}", self.range.start(), self.range.end()),
                actual: value.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validator_accepts_valid_tokens() {
        let validator = IdentifierValidator::new("service", 50);
        assert!(validator.validate("storage").is_ok());
        assert!(validator.validate("my_service-2").is_ok());
    }

    #[test]
    fn test_identifier_validator_rejects_empty() {
        let validator = IdentifierValidator::new("service", 50);
        assert!(matches!(
            validator.validate(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_identifier_validator_rejects_uppercase() {
        let validator = IdentifierValidator::new("service", 50);
        assert!(validator.validate("Storage").is_err());
    }

    #[test]
    fn test_identifier_validator_rejects_too_long() {
        let validator = IdentifierValidator::new("service", 8);
        assert!(matches!(
            validator.validate("averylongname"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_batch_size_validator_bounds() {
        let validator = BatchSizeValidator::new("checks", 1, 50);
        assert!(validator.validate(&1).is_ok());
        assert!(validator.validate(&50).is_ok());
        assert!(validator.validate(&0).is_err());
        assert!(validator.validate(&51).is_err());
    }
}
