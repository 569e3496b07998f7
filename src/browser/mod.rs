//! Tree views over one sub-hierarchy each
//!
//! A browser owns its tree, its selection and its `displayed`/`selected`
//! flags. The orchestrator feeds it load results through the default methods
//! of `Browser`; lazy child expansion is the one kind of load a browser runs
//! on its own, outside the viewer's single pending slot.

mod kind;
mod tree_browser;

pub use kind::BrowserKind;
pub use tree_browser::TreeBrowser;

use crate::loader::{LoaderContext, LoaderId};
use crate::model::{DataObject, NodeId, ObjectKey, Thumbnail, Tree, TreeVisitor};
use crate::service::{Scope, TransferRequest};

/// Payload of a browser tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserNode {
    pub object: DataObject,

    /// Whether the node's children have been fetched
    pub children_loaded: bool,

    pub thumbnail: Option<Thumbnail>,

    /// Marked for a pending cut
    pub cut: bool,
}

impl BrowserNode {
    /// Leaves and empty containers count as loaded
    #[must_use]
    pub fn new(object: DataObject) -> Self {
        let children_loaded = !object.kind.is_container() || object.child_count == 0;
        Self {
            object,
            children_loaded,
            thumbnail: None,
            cut: false,
        }
    }

    #[must_use]
    pub const fn key(&self) -> ObjectKey {
        self.object.key()
    }
}

/// One independently stateful tree view
pub trait Browser: Send {
    fn browser_type(&self) -> BrowserKind;

    /// Make this the working browser
    fn activate(&mut self);

    /// Drop the loaded tree so the next root load starts from scratch
    fn refresh_tree(&mut self);

    /// Whether the top level has been loaded since the last refresh
    fn roots_loaded(&self) -> bool;

    fn tree(&self) -> &Tree<BrowserNode>;

    fn tree_mut(&mut self) -> &mut Tree<BrowserNode>;

    /// Selected nodes, oldest first
    fn selected_displays(&self) -> Vec<NodeId>;

    fn last_selected_display(&self) -> Option<NodeId> {
        self.selected_displays().last().copied()
    }

    /// Replace the selection; ids not in the tree are ignored
    fn set_selected_nodes(&mut self, nodes: &[NodeId]);

    /// Remove every node showing one of `keys`, returning how many went
    fn remove_tree_nodes(&mut self, keys: &[ObjectKey]) -> usize;

    /// Cancel this browser's own in-flight loads
    fn cancel(&mut self);

    fn is_displayed(&self) -> bool;

    fn set_displayed(&mut self, displayed: bool);

    /// Whether this is the viewer's working browser
    fn is_selected(&self) -> bool;

    fn set_selected(&mut self, selected: bool);

    /// Start a lazy children load for `node`
    ///
    /// Returns `None` when the node is unknown, is not an unloaded container,
    /// or is already being expanded.
    fn expand(&mut self, node: NodeId, scope: Scope, context: &LoaderContext) -> Option<LoaderId>;

    /// Forget an own load once its result arrived; false if not ours
    fn release_load(&mut self, id: LoaderId) -> bool;

    fn pending_loads(&self) -> usize;

    /// Tear down for good
    fn discard(&mut self);

    /// Replace the tree with a freshly loaded top level
    fn set_roots(&mut self, roots: Vec<DataObject>);

    fn accept(&self, visitor: &mut dyn TreeVisitor<BrowserNode>) {
        self.tree().accept(visitor);
    }

    /// Nodes showing the object `key`
    fn find_nodes(&self, key: ObjectKey) -> Vec<NodeId> {
        self.tree().find(|node| node.key() == key)
    }

    fn node(&self, id: NodeId) -> Option<&BrowserNode> {
        self.tree().get(id).map(|node| &node.payload)
    }

    /// Objects of the selected nodes, oldest first
    fn selected_objects(&self) -> Vec<DataObject> {
        self.selected_displays()
            .into_iter()
            .filter_map(|id| self.node(id).map(|node| node.object.clone()))
            .collect()
    }

    /// Object of the parent node of `id`, if any
    fn parent_object(&self, id: NodeId) -> Option<DataObject> {
        let parent = self.tree().parent(id)?;
        self.node(parent).map(|node| node.object.clone())
    }

    /// Populate every node showing `parent`, returning how many were filled
    fn set_children(&mut self, parent: ObjectKey, children: &[DataObject]) -> usize {
        let targets = self.find_nodes(parent);
        let tree = self.tree_mut();
        for target in &targets {
            tree.clear_children(*target);
            for child in children {
                tree.insert(Some(*target), BrowserNode::new(child.clone()));
            }
            if let Some(node) = tree.payload_mut(*target) {
                node.children_loaded = true;
                node.object.child_count = children.len();
            }
        }
        targets.len()
    }

    /// Show a newly created object, returning how many nodes were added
    ///
    /// Under a parent the object only appears where the parent's children are
    /// loaded; elsewhere the parent's child count is bumped.
    fn add_object(&mut self, parent: Option<ObjectKey>, object: &DataObject) -> usize {
        match parent {
            Some(parent) => {
                let targets = self.find_nodes(parent);
                let tree = self.tree_mut();
                let mut added = 0;
                for target in targets {
                    let loaded = tree.get(target).is_some_and(|n| n.payload.children_loaded);
                    if let Some(node) = tree.payload_mut(target) {
                        node.object.child_count += 1;
                    }
                    if loaded {
                        tree.insert(Some(target), BrowserNode::new(object.clone()));
                        added += 1;
                    }
                }
                added
            }
            None => {
                let kind = self.browser_type();
                if self.roots_loaded() && kind.root_kinds().contains(&object.kind) {
                    self.tree_mut().insert(None, BrowserNode::new(object.clone()));
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Replace the object shown by every matching node
    fn update_object(&mut self, object: &DataObject) -> usize {
        let targets = self.find_nodes(object.key());
        let tree = self.tree_mut();
        for target in &targets {
            if let Some(node) = tree.payload_mut(*target) {
                node.object = object.clone();
            }
        }
        targets.len()
    }

    /// Mirror a completed paste in the loaded part of the tree
    fn apply_transfer(&mut self, request: &TransferRequest) {
        for (parent, moved) in &request.unlinks {
            for parent_node in self.find_nodes(*parent) {
                let doomed: Vec<NodeId> = self
                    .tree()
                    .children(parent_node)
                    .iter()
                    .copied()
                    .filter(|child| {
                        self.node(*child)
                            .is_some_and(|n| moved.iter().any(|m| m.key() == n.key()))
                    })
                    .collect();
                let tree = self.tree_mut();
                for child in doomed {
                    tree.remove(child);
                }
                if let Some(node) = tree.payload_mut(parent_node) {
                    node.object.child_count = node.object.child_count.saturating_sub(moved.len());
                }
            }
        }

        for (target, linked) in &request.links {
            for target_node in self.find_nodes(*target) {
                let loaded = self.node(target_node).is_some_and(|n| n.children_loaded);
                let present: Vec<ObjectKey> = self
                    .tree()
                    .children(target_node)
                    .iter()
                    .filter_map(|child| self.node(*child).map(BrowserNode::key))
                    .collect();
                let tree = self.tree_mut();
                for object in linked {
                    if present.contains(&object.key()) {
                        continue;
                    }
                    if let Some(node) = tree.payload_mut(target_node) {
                        node.object.child_count += 1;
                    }
                    if loaded {
                        tree.insert(Some(target_node), BrowserNode::new(object.clone()));
                    }
                }
            }
        }

        // A linked object is no longer an orphan
        if self.browser_type().orphans_only() {
            let linked: Vec<ObjectKey> = request
                .links
                .values()
                .flatten()
                .map(DataObject::key)
                .collect();
            let orphan_roots: Vec<NodeId> = self
                .tree()
                .roots()
                .iter()
                .copied()
                .filter(|root| self.node(*root).is_some_and(|n| linked.contains(&n.key())))
                .collect();
            let tree = self.tree_mut();
            for root in orphan_roots {
                tree.remove(root);
            }
        }

        self.mark_cut(&[], false);
    }

    /// Attach thumbnails to the image nodes they belong to
    fn set_thumbnails(&mut self, thumbnails: &[Thumbnail]) -> usize {
        let mut attached = 0;
        for thumbnail in thumbnails {
            let key = ObjectKey {
                kind: crate::model::DataKind::Image,
                id: thumbnail.image,
            };
            for id in self.find_nodes(key) {
                if let Some(node) = self.tree_mut().payload_mut(id) {
                    node.thumbnail = Some(thumbnail.clone());
                    attached += 1;
                }
            }
        }
        attached
    }

    /// Flag nodes showing `keys` as cut; with `cut == false` every flag is
    /// cleared regardless of `keys`
    fn mark_cut(&mut self, keys: &[ObjectKey], cut: bool) {
        let ids = self.tree().pre_order();
        let tree = self.tree_mut();
        for id in ids {
            if let Some(node) = tree.payload_mut(id) {
                if cut {
                    if keys.contains(&node.key()) {
                        node.cut = true;
                    }
                } else {
                    node.cut = false;
                }
            }
        }
    }
}
