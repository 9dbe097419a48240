//! Checkout error types.

use document_store::StoreError;
use domain::{DomainError, ValidationErrors};
use thiserror::Error;

/// Errors that can occur while running a checkout use case.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The caller passed an unusable argument.
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// An external system could not be reached or answered with an error.
    #[error("Fetching from {port} failed: {reason}")]
    ExternalFetchFailed { port: &'static str, reason: String },

    /// Document store error outside of a domain operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification of a [`CheckoutError`] for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ResourceNotFound,
    IllegalModification,
    ValidationFailed,
    ExternalFetchFailed,
    BadParameter,
    Infrastructure,
}

impl CheckoutError {
    pub fn external(port: &'static str, reason: impl std::fmt::Display) -> Self {
        CheckoutError::ExternalFetchFailed {
            port,
            reason: reason.to_string(),
        }
    }

    pub fn bad_parameter(message: impl Into<String>) -> Self {
        CheckoutError::BadParameter(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Domain(DomainError::ResourceNotFound { .. }) => {
                ErrorKind::ResourceNotFound
            }
            CheckoutError::Domain(DomainError::IllegalModification(_)) => {
                ErrorKind::IllegalModification
            }
            CheckoutError::Domain(DomainError::ValidationFailed(_)) => ErrorKind::ValidationFailed,
            CheckoutError::Domain(DomainError::Store(_) | DomainError::Serialization(_))
            | CheckoutError::Store(_)
            | CheckoutError::Configuration(_) => ErrorKind::Infrastructure,
            CheckoutError::ExternalFetchFailed { .. } => ErrorKind::ExternalFetchFailed,
            CheckoutError::BadParameter(_) => ErrorKind::BadParameter,
        }
    }

    /// Returns the validation errors if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            CheckoutError::Domain(DomainError::ValidationFailed(errors)) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for CheckoutError {
    fn from(errors: ValidationErrors) -> Self {
        CheckoutError::Domain(DomainError::ValidationFailed(errors))
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use domain::{BasketId, Invalid};

    use super::*;

    #[test]
    fn test_kind_classification() {
        let err: CheckoutError = DomainError::not_found("basket", BasketId::new()).into();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);

        let err: CheckoutError = DomainError::illegal("frozen").into();
        assert_eq!(err.kind(), ErrorKind::IllegalModification);

        let err = CheckoutError::external("price", "timeout");
        assert_eq!(err.kind(), ErrorKind::ExternalFetchFailed);
        assert_eq!(err.to_string(), "Fetching from price failed: timeout");

        let err = CheckoutError::bad_parameter("negative quantity");
        assert_eq!(err.kind(), ErrorKind::BadParameter);
    }

    #[test]
    fn test_validation_errors_are_exposed() {
        let errors = ValidationErrors::new(vec![Invalid::null("checkout.customer")]);
        let err: CheckoutError = errors.clone().into();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.validation_errors(), Some(&errors));
    }
}
