//! User-facing notifications
//!
//! The viewer reports rejected commands and failed loads through `Notifier`.
//! `StdoutNotifier` prints them for the CLI shell.

use colored::Colorize;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Sink for user feedback
///
/// # Examples
///
/// ```
/// use treeviewer::ui::{Notifier, StdoutNotifier};
///
/// let notifier = StdoutNotifier::new();
/// notifier.notify_info("Paste", "Nothing to paste");
/// ```
pub trait Notifier: Send + Sync {
    fn notify_info(&self, title: &str, message: &str);

    fn notify_warning(&self, title: &str, message: &str);

    fn notify_error(&self, title: &str, message: &str);
}

/// Prints notifications to stdout/stderr
pub struct StdoutNotifier;

impl StdoutNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for StdoutNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for StdoutNotifier {
    fn notify_info(&self, title: &str, message: &str) {
        println!("{} {}", format!("{title}:").bold(), message.dimmed());
    }

    fn notify_warning(&self, title: &str, message: &str) {
        println!("{} {}: {}", "⚠️".yellow(), title.bold(), message);
    }

    fn notify_error(&self, title: &str, message: &str) {
        eprintln!("{} {}: {}", "❌".red(), title.bold(), message);
    }
}

/// One notification, as recorded by `RecordingNotifier`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: MessageLevel,
    pub title: String,
    pub message: String,
}
