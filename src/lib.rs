//! Treeviewer - a state-machine driven browser for hierarchical data
//!
//! A `TreeViewer` coordinates several tree browsers over a remote data
//! service. Commands that need remote work run as cancellable loaders on a
//! worker pool; their results are applied back on the control thread, and at
//! most one loader is attached to a viewer at any time.

use thiserror::Error;

pub mod browser;
pub mod cli;
pub mod commands;
pub mod config;
pub mod editor;
pub mod events;
pub mod loader;
pub mod logging;
pub mod model;
pub mod service;
pub mod ui;
pub mod viewer;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum TreeViewerError {
    /// Viewer command error
    #[error("Viewer error: {0}")]
    ViewerError(#[from] viewer::ViewerError),
    /// Data service error
    #[error("Data service error: {0}")]
    ServiceError(#[from] service::ServiceError),
    /// Prompt or terminal error
    #[error("UI error: {0}")]
    UiError(#[from] ui::UiError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for the application
pub type Result<T> = std::result::Result<T, TreeViewerError>;
