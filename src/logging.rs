//! Tracing subscriber setup
//!
//! `RUST_LOG` overrides the configured filter directive when set.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter from `RUST_LOG`, falling back to `directive` (then `info`)
#[must_use]
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Build a subscriber writing compact lines to `writer`
pub fn build_subscriber<W>(
    writer: W,
    directive: &str,
) -> impl tracing::Subscriber + Send + Sync + use<W>
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let fmt_layer = fmt::layer().with_writer(writer).with_target(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(directive))
}

/// Install a global subscriber logging to stderr
///
/// Returns false if a global subscriber was already installed.
pub fn init(directive: &str) -> bool {
    build_subscriber(std::io::stderr, directive)
        .try_init()
        .is_ok()
}

/// Install a global subscriber logging to a file
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init_to_file(path: &Path, directive: &str) -> std::io::Result<bool> {
    let file = File::create(path)?;
    Ok(build_subscriber(Arc::new(file), directive).try_init().is_ok())
}
