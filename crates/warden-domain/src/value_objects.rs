//! Value objects representing immutable domain concepts

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Create from string representation
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }

            /// Wrap an existing UUID
            pub fn from_uuid(id: uuid::Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_id!(
    /// User identifier
    UserId
);
uuid_id!(
    /// Company identifier (tenant boundary)
    CompanyId
);
uuid_id!(
    /// Project identifier within a company
    ProjectId
);
uuid_id!(
    /// Role identifier
    RoleId
);
uuid_id!(
    /// Policy identifier
    PolicyId
);
uuid_id!(
    /// Permission identifier
    PermissionId
);

/// Pre-verified identity attached to every call.
///
/// Identity resolution (token verification) happens outside this core;
/// callers thread the resolved identity explicitly through every
/// operation so that no request-scoped state is shared between
/// concurrent decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    pub user_id: UserId,
    pub company_id: CompanyId,
}

impl IdentityContext {
    pub fn new(user_id: UserId, company_id: CompanyId) -> Self {
        Self {
            user_id,
            company_id,
        }
    }
}

/// Operation component of a permission.
///
/// The standard CRUD operations plus LIST for collection endpoints.
/// Catalog rows may carry additional operation values via `Custom`;
/// request parsing accepts any uppercase `[A-Z_]+` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
    Custom(String),
}

impl Operation {
    /// Parse an operation token.
    ///
    /// Known CRUD values map to their variants; any other uppercase
    /// `[A-Z_]+` token becomes `Custom`. Anything else is a validation
    /// error.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "LIST" => Ok(Operation::List),
            "CREATE" => Ok(Operation::Create),
            "READ" => Ok(Operation::Read),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            other => {
                if !other.is_empty()
                    && other.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                {
                    Ok(Operation::Custom(other.to_string()))
                } else {
                    Err(DomainError::Validation {
                        field: "operation".to_string(),
                        reason: format!(
                            "'{other}' is not a valid operation (expected an uppercase token such as READ or DELETE)"
                        ),
                    })
                }
            }
        }
    }

    /// String form as stored in the catalog
    pub fn as_str(&self) -> &str {
        match self {
            Operation::List => "LIST",
            Operation::Create => "CREATE",
            Operation::Read => "READ",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Custom(s) => s,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Operation::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Canonical permission name: exactly `service:resource:operation`.
///
/// The canonical string is the global identity of a catalog entry; two
/// permissions with the same name are the same permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionName {
    service: String,
    resource_name: String,
    operation: Operation,
}

impl PermissionName {
    pub fn new(service: &str, resource_name: &str, operation: Operation) -> Self {
        Self {
            service: service.to_string(),
            resource_name: resource_name.to_string(),
            operation,
        }
    }

    /// Parse a canonical name of the form `service:resource:operation`.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(DomainError::Validation {
                field: "permission_name".to_string(),
                reason: format!("'{value}' is not of the form service:resource:operation"),
            });
        }
        Ok(Self {
            service: parts[0].to_string(),
            resource_name: parts[1].to_string(),
            operation: Operation::parse(parts[2])?,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Render the canonical `service:resource:operation` string
    pub fn canonical(&self) -> String {
        format!(
            "{}:{}:{}",
            self.service,
            self.resource_name,
            self.operation.as_str()
        )
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl Serialize for PermissionName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for PermissionName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        PermissionName::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Assignment scope kind.
///
/// `Hierarchical` is reserved metadata for future organization-tree
/// propagation; it currently evaluates identically to `Direct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Direct,
    Hierarchical,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Direct => "direct",
            ScopeType::Hierarchical => "hierarchical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(ScopeType::Direct),
            "hierarchical" => Some(ScopeType::Hierarchical),
            _ => None,
        }
    }
}

impl Default for ScopeType {
    fn default() -> Self {
        ScopeType::Direct
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed set of decision reason codes.
///
/// The engine is statically restricted to this set. `RoleExpired`,
/// `RoleInactive`, `ProjectMismatch`, and `CompanyMismatch` are reserved
/// for finer-grained diagnostics; the default algorithm collapses every
/// "assignment present but ineligible" case into `NoMatchingRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    Granted,
    NoPermission,
    NoMatchingRole,
    RoleExpired,
    RoleInactive,
    ProjectMismatch,
    CompanyMismatch,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessReason::Granted => "granted",
            AccessReason::NoPermission => "no_permission",
            AccessReason::NoMatchingRole => "no_matching_role",
            AccessReason::RoleExpired => "role_expired",
            AccessReason::RoleInactive => "role_inactive",
            AccessReason::ProjectMismatch => "project_mismatch",
            AccessReason::CompanyMismatch => "company_mismatch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "granted" => Some(AccessReason::Granted),
            "no_permission" => Some(AccessReason::NoPermission),
            "no_matching_role" => Some(AccessReason::NoMatchingRole),
            "role_expired" => Some(AccessReason::RoleExpired),
            "role_inactive" => Some(AccessReason::RoleInactive),
            "project_mismatch" => Some(AccessReason::ProjectMismatch),
            "company_mismatch" => Some(AccessReason::CompanyMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
