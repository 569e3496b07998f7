//! Viewer error types
//!
//! Business-rule refusals (incompatible paste, nothing to paste) are not
//! errors; they come back as `CommandOutcome::Rejected`. What is left here
//! are caller mistakes that fail fast before any state change.

use super::state::LifecycleState;
use crate::browser::BrowserKind;
use crate::model::NodeId;
use crate::service::ServiceError;
use crate::ui::UiError;
use thiserror::Error;

/// Errors returned by `TreeViewer` operations
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The operation is not allowed in the current lifecycle state
    #[error("Cannot {operation} while the viewer is {state}")]
    IllegalState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// A required argument was empty or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The browser kind is not registered in this viewer
    #[error("Browser not registered: {0}")]
    UnknownBrowser(BrowserKind),

    /// The node does not exist in the browser's tree
    #[error("Node {node} not found in {browser}")]
    UnknownNode { browser: BrowserKind, node: NodeId },

    /// A synchronous call into the data service failed
    #[error("Data service error: {0}")]
    Service(#[from] ServiceError),

    /// A confirmation prompt could not be answered
    #[error("Prompt failed: {0}")]
    Prompt(#[from] UiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// The loader worker pool could not be started
    #[error("Failed to start loader pool: {0}")]
    Executor(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
