//! Finder results and selection → editor synchronization

use crate::editor::Editor;
use crate::model::{DataObject, UserId};

/// Search panel state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finder {
    visible: bool,
    results: Vec<DataObject>,
}

impl Finder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns whether the visibility changed
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }

    #[must_use]
    pub fn results(&self) -> &[DataObject] {
        &self.results
    }

    pub fn set_results(&mut self, results: Vec<DataObject>) {
        self.results = results;
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }
}

/// Point the editor at the current selection
///
/// The last selected object becomes the root; the others are its related
/// nodes. Objects without an owner are shown as owned by `current_user`.
pub fn sync_editor(editor: &mut dyn Editor, selected: &[DataObject], current_user: UserId) {
    let Some((last, others)) = selected.split_last() else {
        editor.set_selection_mode(true);
        editor.set_root_object(None, None);
        editor.set_related_nodes(Vec::new());
        return;
    };

    let owner = last.owner.unwrap_or(current_user);
    editor.set_selection_mode(others.is_empty());
    editor.set_root_object(Some(last.clone()), Some(owner));
    editor.set_related_nodes(others.to_vec());
}
