//! UI abstraction layer
//!
//! The viewer core never draws anything. It reports to the user through
//! `Notifier` and asks questions through `ConfirmationPolicy`; the host
//! picks the implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      TreeViewer (orchestrator)          │
//! └────────────────┬────────────────────────┘
//!                  │ Uses traits
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  Notifier, ConfirmationPolicy           │
//! └────────────────┬────────────────────────┘
//!                  │ Implemented by
//!         ┌────────┴──────────┐
//!         ▼                   ▼
//! ┌────────────────┐  ┌───────────────────┐
//! │ Terminal       │  │ Scripted          │
//! │ - Stdout       │  │ - Recording       │
//! │ - Dialoguer    │  │ - ScriptedConfirm │
//! │                │  │ - AlwaysConfirm   │
//! └────────────────┘  └───────────────────┘
//! ```
//!
//! ## Scripted answers
//!
//! ```
//! use treeviewer::ui::{Answer, ConfirmationPolicy, ScriptedConfirm};
//!
//! let policy = ScriptedConfirm::new([Answer::No]);
//! assert_eq!(policy.confirm("Delete 1 object?").unwrap(), Answer::No);
//! assert_eq!(policy.asked(), vec!["Delete 1 object?".to_string()]);
//! ```

mod error;

pub mod input;
pub mod mock;
pub mod output;

pub use error::{Result, UiError};
pub use input::{AlwaysConfirm, Answer, ConfirmationPolicy, DialoguerConfirm};
pub use mock::{RecordingNotifier, ScriptedConfirm};
pub use output::{MessageLevel, Notification, Notifier, StdoutNotifier};
