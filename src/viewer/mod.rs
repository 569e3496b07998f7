//! Tree viewer orchestration
//!
//! `TreeViewer` is the only type that interprets commands and loader results
//! and changes the lifecycle state. It owns a `TreeViewerModel` holding the
//! browser registry, the copy buffer and the single pending loader slot.

mod copy;
mod delete;
mod error;
mod finder;
mod model;
mod orchestrator;
mod session;
mod state;

pub use copy::{CommandOutcome, CopyBuffer, CopyMode, NodeRef, Rejection};
pub use delete::{DeletableObject, DeletionRequest};
pub use error::{Result, ViewerError};
pub use finder::{Finder, sync_editor};
pub use model::{DataOperation, PendingLoad, TreeViewerModel};
pub use orchestrator::{TreeViewer, TreeViewerBuilder};
pub use session::{SessionId, SessionRegistry};
pub use state::LifecycleState;
