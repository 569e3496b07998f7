//! Data service error types
//!
//! These errors come back from the remote data layer while a loader runs off
//! the control thread. They never escape as hard failures: the viewer turns
//! them into a user notification and returns to an interactive state.

use crate::model::{DataKind, ObjectKey};
use thiserror::Error;

/// Errors reported by a `DataService`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The object does not exist on the server
    #[error("Object not found: {0}")]
    NotFound(ObjectKey),

    /// A link between two kinds that the hierarchy does not allow
    #[error("Cannot place a {child} inside a {parent}")]
    Incompatible { parent: DataKind, child: DataKind },

    /// The current user may not perform the operation
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// The service could not be reached or failed internally
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Malformed data handed to the service
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for data service calls
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
