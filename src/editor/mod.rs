//! Editor / inspector pane contract
//!
//! The pane itself is out of scope; the viewer only drives it through
//! `Editor`. `EditorPane` keeps the pushed state behind a shared handle so a
//! host (or a test) can read what the viewer told it.

use crate::model::{DataObject, UserId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Detail pane kept in sync with the tree selection
pub trait Editor: Send {
    /// Show `object` (or nothing) as owned by `owner`
    fn set_root_object(&mut self, object: Option<DataObject>, owner: Option<UserId>);

    /// Other objects selected alongside the root object
    fn set_related_nodes(&mut self, nodes: Vec<DataObject>);

    /// `true` for a single selection, `false` for a multiple one
    fn set_selection_mode(&mut self, single: bool);

    fn has_data_to_save(&self) -> bool;

    /// Persist pending edits
    fn save_data(&mut self);

    /// Throw pending edits away
    fn clear_data_to_save(&mut self);
}

/// Everything the viewer has pushed into an `EditorPane`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub root: Option<DataObject>,
    pub owner: Option<UserId>,
    pub related: Vec<DataObject>,
    pub single_selection: bool,
    pub dirty: bool,
    /// How many times pending edits were saved
    pub saves: usize,
}

/// Shared-state editor; clones observe the same pane
#[derive(Debug, Clone, Default)]
pub struct EditorPane {
    state: Arc<Mutex<EditorState>>,
}

impl EditorPane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> EditorState {
        self.state().clone()
    }

    /// Simulate the user editing the shown object
    pub fn mark_dirty(&self) {
        self.state().dirty = true;
    }
}

impl Editor for EditorPane {
    fn set_root_object(&mut self, object: Option<DataObject>, owner: Option<UserId>) {
        let mut state = self.state();
        debug!(root = ?object.as_ref().map(DataObject::key), "Editor root changed");
        state.root = object;
        state.owner = owner;
        if state.root.is_none() {
            state.related.clear();
        }
    }

    fn set_related_nodes(&mut self, nodes: Vec<DataObject>) {
        self.state().related = nodes;
    }

    fn set_selection_mode(&mut self, single: bool) {
        self.state().single_selection = single;
    }

    fn has_data_to_save(&self) -> bool {
        self.state().dirty
    }

    fn save_data(&mut self) {
        let mut state = self.state();
        if state.dirty {
            state.dirty = false;
            state.saves += 1;
        }
    }

    fn clear_data_to_save(&mut self) {
        self.state().dirty = false;
    }
}
