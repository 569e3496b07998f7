//! Treeviewer CLI application entry point
//!
//! Runs a line-oriented shell over a tree viewer, or manages the stored
//! configuration.
//!
//! # Usage
//!
//! ```bash
//! # Interactive shell over the built-in sample data (default command)
//! treeviewer
//! treeviewer shell
//!
//! # Run a script without prompts, against objects from a JSON file
//! treeviewer shell --yes --data objects.json --script moves.txt
//!
//! # Start in another browser, as another user
//! treeviewer shell --browser tag-explorer --user 2
//!
//! # Configuration
//! treeviewer config show
//! treeviewer config set confirm_delete=false
//!
//! # Verbose logging to a file
//! treeviewer --log treeviewer=debug --log-file viewer.log
//! ```
//!
//! # Configuration
//!
//! The configuration is stored in the user's config directory
//! (`~/.config/treeviewer/config.toml` on Linux) and created with defaults
//! on first run.

use treeviewer::{
    Result,
    cli::{Cli, Commands},
    commands::{self, shell::ShellOptions},
    config::ViewerConfig,
    logging,
    model::{GroupId, UserId},
    service::Scope,
};

/// Main entry point for the treeviewer application
///
/// Loads configuration, installs logging and dispatches to the command
/// handler.
///
/// # Errors
///
/// Returns `TreeViewerError` if configuration loading fails, the log file
/// cannot be created, or the command handler returns an error.
fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let path = ViewerConfig::config_path()?;
    let config = ViewerConfig::load()?;

    let directive = cli.log.as_deref().unwrap_or(&config.log_filter);
    match &cli.log_file {
        Some(file) => {
            logging::init_to_file(file, directive)?;
        }
        None => {
            logging::init(directive);
        }
    }
    tracing::debug!(config = %path.display(), "Configuration loaded");

    match cli.get_command() {
        Commands::Shell {
            script,
            yes,
            data,
            browser,
            user,
            group,
        } => commands::shell(
            config,
            ShellOptions {
                script,
                yes,
                data,
                browser,
                scope: Scope::new(UserId(user), GroupId(group)),
                quiet: cli.quiet,
            },
        ),
        Commands::Config { command } => commands::config(config, &command, &path, cli.quiet),
    }
}
