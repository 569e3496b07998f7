//! Deletion requests built from the selected nodes

use crate::model::{AnnotationKind, DataKind, DataObject};
use crate::service::DeleteDescriptor;
use std::collections::BTreeMap;

/// A node about to be deleted, with what deleting it would touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletableObject {
    pub object: DataObject,
    pub has_content: bool,
    pub annotations: Vec<AnnotationKind>,
}

impl DeletableObject {
    /// Inspect `object`; `loaded_children` counts children already in a tree
    #[must_use]
    pub fn inspect(object: DataObject, loaded_children: usize) -> Self {
        let has_content =
            object.kind.is_container() && (object.child_count > 0 || loaded_children > 0);
        let mut annotations = object.annotations.clone();
        annotations.sort();
        annotations.dedup();
        Self {
            object,
            has_content,
            annotations,
        }
    }
}

/// One delete invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub targets: Vec<DeletableObject>,
    pub delete_contents: bool,
    /// Annotation kinds to delete along with the targets
    pub annotation_kinds: Vec<AnnotationKind>,
}

impl DeletionRequest {
    /// Request deleting only the objects themselves
    #[must_use]
    pub const fn new(targets: Vec<DeletableObject>) -> Self {
        Self {
            targets,
            delete_contents: false,
            annotation_kinds: Vec::new(),
        }
    }

    /// Number of targets per kind
    #[must_use]
    pub fn classify(&self) -> BTreeMap<DataKind, usize> {
        let mut counts = BTreeMap::new();
        for target in &self.targets {
            *counts.entry(target.object.kind).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        self.targets.iter().any(|t| t.has_content)
    }

    /// Annotation kinds found on any target
    #[must_use]
    pub fn annotations_found(&self) -> Vec<AnnotationKind> {
        let mut kinds: Vec<AnnotationKind> = self
            .targets
            .iter()
            .flat_map(|t| t.annotations.iter().copied())
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Human readable count, e.g. "2 datasets and 1 image"
    #[must_use]
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .classify()
            .into_iter()
            .map(|(kind, count)| {
                if count == 1 {
                    format!("1 {kind}")
                } else {
                    format!("{count} {kind}s")
                }
            })
            .collect();
        match parts.split_last() {
            None => "nothing".to_string(),
            Some((last, [])) => last.clone(),
            Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
        }
    }

    /// Per-object instructions for the delete loader
    #[must_use]
    pub fn descriptors(&self) -> Vec<DeleteDescriptor> {
        self.targets
            .iter()
            .map(|target| DeleteDescriptor {
                object: target.object.key(),
                delete_contents: self.delete_contents && target.has_content,
                annotation_kinds: self
                    .annotation_kinds
                    .iter()
                    .copied()
                    .filter(|kind| target.annotations.contains(kind))
                    .collect(),
            })
            .collect()
    }
}
