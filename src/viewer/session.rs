//! Explicit registry of live viewers, owned by the hosting shell

use super::orchestrator::TreeViewer;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Handle of a viewer registered in a `SessionRegistry`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Viewers created by one shell
///
/// Discarding a session discards its viewer before dropping it, so no
/// result can reach a viewer that has left the registry.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, TreeViewer>,
    next_id: u64,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, viewer: TreeViewer) -> SessionId {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        debug!(session = %id, "Viewer session created");
        self.sessions.insert(id, viewer);
        id
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&TreeViewer> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut TreeViewer> {
        self.sessions.get_mut(&id)
    }

    /// Discard and drop a viewer; returns false for an unknown id
    pub fn discard(&mut self, id: SessionId) -> bool {
        let Some(mut viewer) = self.sessions.remove(&id) else {
            return false;
        };
        viewer.discard();
        debug!(session = %id, "Viewer session discarded");
        true
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
