//! Copy/cut buffer and paste planning

use crate::loader::LoaderId;
use crate::model::{DataKind, DataObject, ObjectKey};
use crate::service::TransferRequest;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Link into the target and keep the original link
    Copy,
    /// Link into the target and drop the link to the old parent
    Cut,
}

/// A copied node: the object and the parent it was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub object: DataObject,
    pub parent: Option<ObjectKey>,
}

impl NodeRef {
    #[must_use]
    pub const fn new(object: DataObject, parent: Option<ObjectKey>) -> Self {
        Self { object, parent }
    }
}

/// Nodes waiting for a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyBuffer {
    pub nodes: Vec<NodeRef>,
    pub mode: CopyMode,
}

impl CopyBuffer {
    #[must_use]
    pub const fn new(nodes: Vec<NodeRef>, mode: CopyMode) -> Self {
        Self { nodes, mode }
    }

    /// Common kind of the buffered objects; `None` if empty or mixed
    #[must_use]
    pub fn kind(&self) -> Option<DataKind> {
        let first = self.nodes.first()?.object.kind;
        self.nodes
            .iter()
            .all(|node| node.object.kind == first)
            .then_some(first)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.nodes.iter().map(|node| node.object.key()).collect()
    }

    /// Plan the link/unlink work of pasting into `targets`
    ///
    /// # Errors
    ///
    /// Returns the business rule that forbids the paste.
    pub fn plan_paste(&self, targets: &[DataObject]) -> Result<TransferRequest, Rejection> {
        if self.nodes.is_empty() {
            return Err(Rejection::EmptyCopyBuffer);
        }
        if targets.is_empty() {
            return Err(Rejection::NoTargets);
        }
        let kind = self.kind().ok_or(Rejection::MixedKinds)?;
        if self.mode == CopyMode::Cut && targets.len() > 1 {
            return Err(Rejection::CutToManyTargets);
        }
        if let Some(target) = targets.iter().find(|t| !t.kind.accepts(kind)) {
            return Err(Rejection::Incompatible {
                parent: target.kind,
                child: kind,
            });
        }

        let mut request = TransferRequest::default();
        for target in targets {
            let target_key = target.key();
            for node in &self.nodes {
                // Already linked there
                if node.parent == Some(target_key) {
                    continue;
                }
                request
                    .links
                    .entry(target_key)
                    .or_default()
                    .push(node.object.clone());

                if self.mode == CopyMode::Cut
                    && let Some(parent) = node.parent
                {
                    request
                        .unlinks
                        .entry(parent)
                        .or_default()
                        .push(node.object.clone());
                }
            }
        }

        if request.is_empty() {
            return Err(Rejection::NothingToPaste);
        }
        Ok(request)
    }
}

/// A command refused by a business rule; the viewer state is unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyCopyBuffer,
    NoTargets,
    /// Buffered objects are not all of one kind
    MixedKinds,
    Incompatible {
        parent: DataKind,
        child: DataKind,
    },
    /// A cut node cannot move to several parents
    CutToManyTargets,
    /// Every buffered node is already under the target
    NothingToPaste,
    NoRenderingSettings,
    InvalidSettingsTarget(DataKind),
    /// Nothing in the selection to act on
    EmptySelection,
    /// The user cancelled a confirmation prompt
    Declined,
    /// A container's children must be loaded before acting on them
    ContentsNotLoaded,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCopyBuffer => f.write_str("Nothing has been copied"),
            Self::NoTargets => f.write_str("No target selected"),
            Self::MixedKinds => f.write_str("Copied objects must all be of the same kind"),
            Self::Incompatible { parent, child } => {
                write!(f, "Cannot place a {child} inside a {parent}")
            }
            Self::CutToManyTargets => f.write_str("Cut objects can only be pasted into one target"),
            Self::NothingToPaste => f.write_str("The objects are already in the target"),
            Self::NoRenderingSettings => f.write_str("No rendering settings have been copied"),
            Self::InvalidSettingsTarget(kind) => {
                write!(f, "Rendering settings cannot be applied to a {kind}")
            }
            Self::EmptySelection => f.write_str("Nothing selected"),
            Self::Declined => f.write_str("Cancelled by the user"),
            Self::ContentsNotLoaded => {
                f.write_str("Open the container to load its contents first")
            }
        }
    }
}

/// What a viewer command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A loader was attached and started
    Dispatched(LoaderId),
    /// Done synchronously, no loader needed
    Completed,
    Rejected(Rejection),
}

impl CommandOutcome {
    #[must_use]
    pub const fn loader(&self) -> Option<LoaderId> {
        match self {
            Self::Dispatched(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
