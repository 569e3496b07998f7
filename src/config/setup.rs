//! Interactive setup wizard for first-time configuration

use super::ViewerConfig;
use crate::browser::BrowserKind;
use config::ConfigError;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::path::Path;

/// Interactive first-time setup
///
/// Prompts for the default browser, whether deletes need confirmation and
/// the loader pool size, then saves the result to `path`.
///
/// # Errors
///
/// Returns `ConfigError` if user input cannot be read or the configuration
/// cannot be saved.
pub fn first_time_setup(path: &Path) -> Result<ViewerConfig, ConfigError> {
    println!("Welcome to treeviewer! Let's set up your configuration.\n");

    let theme = ColorfulTheme::default();
    let kinds = BrowserKind::all();
    let names: Vec<&str> = kinds.iter().map(|kind| kind.name()).collect();

    let choice = Select::with_theme(&theme)
        .with_prompt("Default browser")
        .items(&names)
        .default(0)
        .interact()
        .map_err(|e| ConfigError::Message(format!("Failed to read input: {e}")))?;

    let confirm_delete = Confirm::with_theme(&theme)
        .with_prompt("Ask before deleting objects?")
        .default(true)
        .interact()
        .map_err(|e| ConfigError::Message(format!("Failed to read input: {e}")))?;

    let worker_threads: usize = Input::with_theme(&theme)
        .with_prompt("Loader threads")
        .default(2)
        .interact_text()
        .map_err(|e| ConfigError::Message(format!("Failed to read input: {e}")))?;

    let config = ViewerConfig {
        default_browser: kinds.get(choice).copied().unwrap_or_default(),
        confirm_delete,
        worker_threads,
        ..ViewerConfig::default()
    };
    config.validate()?;
    config.save_to(path)?;

    println!("\nConfiguration saved to {}", path.display());
    Ok(config)
}
