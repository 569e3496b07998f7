//! Arena-tree backed browser

use super::{Browser, BrowserKind, BrowserNode};
use crate::loader::{LoadRequest, Loader, LoaderContext, LoaderId};
use crate::model::{DataObject, NodeId, ObjectKey, Tree};
use crate::service::Scope;
use tracing::{debug, trace};

/// Standard `Browser` implementation
#[derive(Debug)]
pub struct TreeBrowser {
    kind: BrowserKind,
    tree: Tree<BrowserNode>,
    selection: Vec<NodeId>,
    displayed: bool,
    selected: bool,
    roots_loaded: bool,
    /// Own lazy-expansion loads and the node each one fills
    loads: Vec<(Loader, NodeId)>,
}

impl TreeBrowser {
    #[must_use]
    pub fn new(kind: BrowserKind) -> Self {
        Self {
            kind,
            tree: Tree::new(),
            selection: Vec::new(),
            displayed: false,
            selected: false,
            roots_loaded: false,
            loads: Vec::new(),
        }
    }

    fn cancel_loads(&mut self) {
        for (loader, node) in self.loads.drain(..) {
            trace!(browser = %self.kind, id = %loader.id(), %node, "Cancelling expansion");
            loader.cancel();
        }
    }
}

impl Browser for TreeBrowser {
    fn browser_type(&self) -> BrowserKind {
        self.kind
    }

    fn activate(&mut self) {
        self.selected = true;
        self.displayed = true;
    }

    fn refresh_tree(&mut self) {
        self.cancel_loads();
        self.tree.clear();
        self.selection.clear();
        self.roots_loaded = false;
    }

    fn roots_loaded(&self) -> bool {
        self.roots_loaded
    }

    fn tree(&self) -> &Tree<BrowserNode> {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut Tree<BrowserNode> {
        &mut self.tree
    }

    fn selected_displays(&self) -> Vec<NodeId> {
        self.selection
            .iter()
            .copied()
            .filter(|id| self.tree.contains(*id))
            .collect()
    }

    fn set_selected_nodes(&mut self, nodes: &[NodeId]) {
        self.selection = nodes
            .iter()
            .copied()
            .filter(|id| self.tree.contains(*id))
            .collect();
        self.selection.dedup();
    }

    fn remove_tree_nodes(&mut self, keys: &[ObjectKey]) -> usize {
        // Removing a node removes its subtree, so skip ids already gone
        let targets = self.tree.find(|node| keys.contains(&node.key()));
        let mut removed = 0;
        for id in targets {
            if self.tree.contains(id) {
                removed += self.tree.remove(id).len();
            }
        }
        let tree = &self.tree;
        self.selection.retain(|id| tree.contains(*id));
        self.loads.retain(|(loader, node)| {
            let keep = tree.contains(*node);
            if !keep {
                loader.cancel();
            }
            keep
        });
        removed
    }

    fn cancel(&mut self) {
        self.cancel_loads();
    }

    fn is_displayed(&self) -> bool {
        self.displayed
    }

    fn set_displayed(&mut self, displayed: bool) {
        self.displayed = displayed;
    }

    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    fn expand(&mut self, node: NodeId, scope: Scope, context: &LoaderContext) -> Option<LoaderId> {
        let payload = &self.tree.get(node)?.payload;
        if !payload.object.kind.is_container() || payload.children_loaded {
            return None;
        }
        if self.loads.iter().any(|(_, target)| *target == node) {
            return None;
        }

        let mut loader = context.loader(LoadRequest::Children {
            parent: payload.key(),
            scope,
        });
        let id = loader.id();
        debug!(browser = %self.kind, %id, %node, "Expanding node");
        loader.load();
        self.loads.push((loader, node));
        Some(id)
    }

    fn release_load(&mut self, id: LoaderId) -> bool {
        let before = self.loads.len();
        self.loads.retain(|(loader, _)| loader.id() != id);
        self.loads.len() != before
    }

    fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    fn discard(&mut self) {
        self.refresh_tree();
        self.displayed = false;
        self.selected = false;
    }

    fn set_roots(&mut self, roots: Vec<DataObject>) {
        self.cancel_loads();
        self.tree.clear();
        self.selection.clear();
        for object in roots {
            self.tree.insert(None, BrowserNode::new(object));
        }
        self.roots_loaded = true;
    }
}
