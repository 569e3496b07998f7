//! UI error types

use thiserror::Error;

/// Errors that can occur while talking to the user
#[derive(Debug, Error)]
pub enum UiError {
    /// The prompt could not be shown or read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A scripted answer source ran dry with no default to fall back on
    #[error("No answer available for: {0}")]
    NoAnswer(String),
}

/// Result type for UI operations
pub type Result<T> = std::result::Result<T, UiError>;
