//! Domain error types.

use document_store::StoreError;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced basket, item or payment does not exist.
    #[error("{resource} with id {id} not found")]
    ResourceNotFound { resource: &'static str, id: String },

    /// The operation violates a state-machine or business rule.
    #[error("Illegal modification: {0}")]
    IllegalModification(String),

    /// Checkout data failed validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        DomainError::ResourceNotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn illegal(message: impl Into<String>) -> Self {
        DomainError::IllegalModification(message.into())
    }

    /// True for validation failures caused only by stale snapshots.
    pub fn requires_refresh(&self) -> bool {
        matches!(self, DomainError::ValidationFailed(errors) if errors.requires_refresh())
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::ValidationFailed(errors)
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
