//! Command-line interface definitions and parsing
//!
//! This module defines the CLI structure for treeviewer using the `clap` crate.
//!
//! # Commands
//!
//! - **shell**: line-oriented shell driving a viewer (default)
//! - **config**: show, initialise or change the configuration
//!
//! # Examples
//!
//! ```
//! use treeviewer::cli::{Cli, Commands};
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["treeviewer", "shell", "--yes"]);
//! assert!(matches!(cli.get_command(), Commands::Shell { yes: true, .. }));
//! ```

use crate::browser::BrowserKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Treeviewer CLI
#[derive(Parser, Debug)]
#[command(name = "treeviewer")]
#[command(about = "Browse and reorganise hierarchical data", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Log filter directive, e.g. `treeviewer=debug` (`RUST_LOG` wins)
    #[arg(long = "log", value_name = "FILTER", global = true)]
    pub log: Option<String>,

    /// Write logs to a file instead of stderr
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the viewer shell (default)
    #[command(visible_alias = "s")]
    Shell {
        /// Read commands from a file instead of stdin
        #[arg(short = 's', long = "script", value_name = "FILE")]
        script: Option<PathBuf>,

        /// Answer yes to every confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,

        /// Load objects from a JSON file instead of the built-in sample
        #[arg(short = 'd', long = "data", value_name = "FILE")]
        data: Option<PathBuf>,

        /// Browser selected at start (overrides config)
        #[arg(short = 'b', long = "browser", value_enum)]
        browser: Option<BrowserKind>,

        /// User whose data is browsed
        #[arg(long = "user", default_value_t = 1)]
        user: i64,

        /// Group whose data is browsed
        #[arg(long = "group", default_value_t = 1)]
        group: i64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration management subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the path of the configuration file
    Path,

    /// Print the current configuration as TOML
    Show,

    /// Run the interactive setup and overwrite the configuration
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key=value (e.g., `confirm_delete=false`)
        #[arg(value_name = "KEY=VALUE")]
        setting: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key to retrieve (e.g., `worker_threads`)
        #[arg(value_name = "KEY")]
        key: String,
    },
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the command, defaulting to an interactive shell
    #[must_use]
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Shell {
            script: None,
            yes: false,
            data: None,
            browser: None,
            user: 1,
            group: 1,
        })
    }
}
