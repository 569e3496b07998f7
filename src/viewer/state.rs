//! Viewer lifecycle state

use std::fmt;

/// The single authoritative state of a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Built but not activated
    New,
    Ready,
    LoadingData,
    LoadingSelection,
    LoadingThumbnail,
    Saving,
    /// Terminal
    Discarded,
}

impl LifecycleState {
    /// Whether a loader is attached in this state
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(
            self,
            Self::LoadingData | Self::LoadingSelection | Self::LoadingThumbnail | Self::Saving
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Ready => "ready",
            Self::LoadingData => "loading-data",
            Self::LoadingSelection => "loading-selection",
            Self::LoadingThumbnail => "loading-thumbnail",
            Self::Saving => "saving",
            Self::Discarded => "discarded",
        };
        f.write_str(name)
    }
}
