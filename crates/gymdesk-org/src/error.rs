//! Error types for organization operations
//!
//! This module defines the error taxonomy surfaced by the hierarchy service
//! and the small discriminated payload handed back to callers.

use gymdesk_rbac::{PermissionKey, RbacError};
use gymdesk_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ways a hierarchy mutation can be rejected before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyViolation {
    /// The requested parent is the organization itself
    SelfParent,

    /// The requested parent is a descendant of the organization
    CircularReference,

    /// The move or creation would make the tree deeper than allowed
    DepthExceeded { max_depth: usize },
}

impl HierarchyViolation {
    /// Machine-checkable code distinguishing the violations.
    pub fn code(&self) -> &'static str {
        match self {
            HierarchyViolation::SelfParent => "SELF_PARENT",
            HierarchyViolation::CircularReference => "CIRCULAR_REFERENCE",
            HierarchyViolation::DepthExceeded { .. } => "DEPTH_EXCEEDED",
        }
    }
}

impl std::fmt::Display for HierarchyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HierarchyViolation::SelfParent => f.write_str("organization cannot be its own parent"),
            HierarchyViolation::CircularReference => f.write_str(
                "circular reference detected: the new parent is a descendant of the organization",
            ),
            HierarchyViolation::DepthExceeded { max_depth } => {
                write!(f, "hierarchy depth limit of {} levels exceeded", max_depth)
            }
        }
    }
}

/// Organization error types.
#[derive(Debug, Error)]
pub enum OrgError {
    /// Entity id does not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The hierarchy would become invalid
    #[error("Invalid operation: {0}")]
    InvalidOperation(HierarchyViolation),

    /// Input is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// No authenticated identity or organization context
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking a permission
    #[error("Forbidden: missing permission {0}")]
    Forbidden(PermissionKey),

    /// Optimistic version check failed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unexpected data-store failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for organization operations.
pub type OrgResult<T> = Result<T, OrgError>;

/// Coarse error discriminant exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    ValidationError,
    Unauthorized,
    Forbidden,
    Conflict,
    InternalError,
}

/// Error body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl OrgError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        OrgError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, OrgError::Internal(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            OrgError::NotFound { .. } => 404,
            OrgError::InvalidOperation(_) => 422,
            OrgError::Validation(_) => 400,
            OrgError::Unauthorized(_) => 401,
            OrgError::Forbidden(_) => 403,
            OrgError::Conflict(_) => 409,
            OrgError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrgError::NotFound { .. } => "NOT_FOUND",
            OrgError::InvalidOperation(violation) => violation.code(),
            OrgError::Validation(_) => "VALIDATION_ERROR",
            OrgError::Unauthorized(_) => "UNAUTHORIZED",
            OrgError::Forbidden(_) => "FORBIDDEN",
            OrgError::Conflict(_) => "CONFLICT",
            OrgError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrgError::NotFound { .. } => ErrorKind::NotFound,
            OrgError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            OrgError::Validation(_) => ErrorKind::ValidationError,
            OrgError::Unauthorized(_) => ErrorKind::Unauthorized,
            OrgError::Forbidden(_) => ErrorKind::Forbidden,
            OrgError::Conflict(_) => ErrorKind::Conflict,
            OrgError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Caller-facing payload. Internal details never leave the process.
    pub fn to_payload(&self) -> ErrorPayload {
        let message = match self {
            OrgError::Internal(_) => "An internal error occurred".to_string(),
            OrgError::InvalidOperation(violation) => violation.to_string(),
            other => other.to_string(),
        };
        ErrorPayload {
            kind: self.kind(),
            code: self.error_code().to_string(),
            message,
        }
    }
}

impl From<StoreError> for OrgError {
    fn from(error: StoreError) -> Self {
        OrgError::Internal(error.to_string())
    }
}

impl From<RbacError> for OrgError {
    fn from(error: RbacError) -> Self {
        match error {
            RbacError::NotFound { entity, id } => OrgError::NotFound { entity, id },
            RbacError::Forbidden(key) => OrgError::Forbidden(key),
            RbacError::Validation(message) => OrgError::Validation(message),
            other => OrgError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for OrgError {
    fn from(errors: validator::ValidationErrors) -> Self {
        OrgError::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for OrgError {
    fn from(error: serde_json::Error) -> Self {
        OrgError::Validation(error.to_string())
    }
}
