//! Error types for RBAC operations

use gymdesk_store::StoreError;
use thiserror::Error;

use crate::permissions::PermissionKey;

/// RBAC error types.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Acting user lacks the required permission
    #[error("Forbidden: missing permission {0}")]
    Forbidden(PermissionKey),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stored row could not be interpreted
    #[error("Invalid {table} row: {message}")]
    InvalidRow { table: &'static str, message: String },

    /// Data-store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for RBAC operations.
pub type RbacResult<T> = Result<T, RbacError>;

impl RbacError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RbacError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this error stems from the backend rather than the caller.
    pub fn is_server_error(&self) -> bool {
        matches!(self, RbacError::Store(_) | RbacError::InvalidRow { .. })
    }
}

impl From<validator::ValidationErrors> for RbacError {
    fn from(errors: validator::ValidationErrors) -> Self {
        RbacError::Validation(errors.to_string())
    }
}
