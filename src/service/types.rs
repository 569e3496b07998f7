//! Request payloads handed to the data service

use crate::model::{AnnotationKind, DataKind, DataObject, GroupId, ObjectKey, UserId};
use std::collections::BTreeMap;

/// Whose data is being browsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub user: UserId,
    pub group: GroupId,
}

impl Scope {
    #[must_use]
    pub const fn new(user: UserId, group: GroupId) -> Self {
        Self { user, group }
    }
}

/// Query for the top level of a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootQuery {
    /// Kinds shown at the top level
    pub kinds: Vec<DataKind>,

    /// Only objects that have no parent (e.g. datasets outside any project)
    pub orphans_only: bool,

    pub scope: Scope,
}

/// Combined link/unlink operation produced by a paste
///
/// `links` maps each paste target to the objects placed under it;
/// `unlinks` maps each former parent to the objects moved away from it
/// (empty for a copy).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferRequest {
    pub links: BTreeMap<ObjectKey, Vec<DataObject>>,
    pub unlinks: BTreeMap<ObjectKey, Vec<DataObject>>,
}

impl TransferRequest {
    /// Whether the request carries no work
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.values().all(Vec::is_empty) && self.unlinks.values().all(Vec::is_empty)
    }

    /// Number of distinct objects affected
    #[must_use]
    pub fn object_count(&self) -> usize {
        let mut keys: Vec<ObjectKey> = self
            .links
            .values()
            .chain(self.unlinks.values())
            .flatten()
            .map(DataObject::key)
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }
}

/// Per-object instruction for a batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDescriptor {
    pub object: ObjectKey,

    /// Also delete the contained children
    pub delete_contents: bool,

    /// Annotation kinds to delete along with the object
    pub annotation_kinds: Vec<AnnotationKind>,
}
