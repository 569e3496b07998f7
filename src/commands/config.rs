//! Config command - inspect and change the stored configuration

use crate::{
    Result, TreeViewerError,
    browser::BrowserKind,
    cli::ConfigCommands,
    config::{ViewerConfig, first_time_setup},
};
use clap::ValueEnum;
use std::path::Path;

const KEYS: &str = "default_browser, worker_threads, confirm_delete, log_filter, \
                    thumbnail_cache_capacity, thumbnail_ttl_secs";

fn unknown_key(key: &str) -> TreeViewerError {
    TreeViewerError::InvalidInput(format!(
        "Unknown configuration key: '{key}'. Available keys: {KEYS}"
    ))
}

fn invalid_value(key: &str, value: &str, expected: &str) -> TreeViewerError {
    TreeViewerError::InvalidInput(format!(
        "Invalid value for {key}: '{value}'. Use {expected}"
    ))
}

/// Change one setting in memory and validate the result
///
/// # Errors
///
/// Returns `InvalidInput` for an unknown key or unparsable value, and
/// `ConfigError` when the new configuration fails validation.
pub fn apply_setting(config: &mut ViewerConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "default_browser" => {
            let kind = <BrowserKind as ValueEnum>::from_str(value, true)
                .map_err(|_| invalid_value(key, value, "a browser name"))?;
            config.default_browser = kind;
        }
        "worker_threads" => {
            config.worker_threads = value
                .parse()
                .map_err(|_| invalid_value(key, value, "a positive number"))?;
        }
        "confirm_delete" => {
            config.confirm_delete = value
                .parse()
                .map_err(|_| invalid_value(key, value, "'true' or 'false'"))?;
        }
        "log_filter" => value.clone_into(&mut config.log_filter),
        "thumbnail_cache_capacity" => {
            config.thumbnail_cache_capacity = value
                .parse()
                .map_err(|_| invalid_value(key, value, "a positive number"))?;
        }
        "thumbnail_ttl_secs" => {
            config.thumbnail_ttl_secs = value
                .parse()
                .map_err(|_| invalid_value(key, value, "a number of seconds"))?;
        }
        _ => return Err(unknown_key(key)),
    }
    config.validate()?;
    Ok(())
}

/// Current value of one setting
///
/// # Errors
///
/// Returns `InvalidInput` for an unknown key.
pub fn get_setting(config: &ViewerConfig, key: &str) -> Result<String> {
    let value = match key {
        "default_browser" => config.default_browser.to_string(),
        "worker_threads" => config.worker_threads.to_string(),
        "confirm_delete" => config.confirm_delete.to_string(),
        "log_filter" => config.log_filter.clone(),
        "thumbnail_cache_capacity" => config.thumbnail_cache_capacity.to_string(),
        "thumbnail_ttl_secs" => config.thumbnail_ttl_secs.to_string(),
        _ => return Err(unknown_key(key)),
    };
    Ok(value)
}

/// Execute the config command against the file at `path`
///
/// # Errors
///
/// Returns an error for a malformed setting, an invalid configuration, or
/// when the file cannot be written.
pub fn execute(
    mut config: ViewerConfig,
    command: &ConfigCommands,
    path: &Path,
    quiet: bool,
) -> Result<()> {
    match command {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => {
            let text = toml::to_string_pretty(&config).map_err(|e| {
                TreeViewerError::InvalidInput(format!("Failed to serialize config: {e}"))
            })?;
            print!("{text}");
        }
        ConfigCommands::Init => {
            first_time_setup(path)?;
        }
        ConfigCommands::Set { setting } => {
            let Some((key, value)) = setting.split_once('=') else {
                return Err(TreeViewerError::InvalidInput(
                    "Invalid format. Use: treeviewer config set key=value".into(),
                ));
            };
            let (key, value) = (key.trim(), value.trim());
            apply_setting(&mut config, key, value)?;
            config.save_to(path)?;
            if !quiet {
                println!("Set {key} = {value}");
            }
        }
        ConfigCommands::Get { key } => println!("{}", get_setting(&config, key)?),
    }
    Ok(())
}
