//! Command implementations
//!
//! Each command is a module with an execute function that takes parsed CLI args
//! and runs the operation against a viewer or the configuration file.

pub mod config;
pub mod shell;

// Re-export execute functions for convenience
pub use self::config::execute as config;
pub use shell::execute as shell;
