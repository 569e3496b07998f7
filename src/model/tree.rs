//! Arena-indexed tree
//!
//! Nodes live in a map keyed by `NodeId`; each node stores its parent and its
//! ordered child ids. Traversal is done by id, which keeps the tree free of
//! any rendering concern and lets callers hold ids across mutations.

use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct TreeNode<T> {
    pub id: NodeId,
    /// Parent node ID (None for roots)
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub payload: T,
}

/// Visitor over tree nodes, called in pre-order by `Tree::accept`
pub trait TreeVisitor<T> {
    fn visit(&mut self, node: &TreeNode<T>, depth: usize);
}

/// Arena tree with any number of roots
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: HashMap<NodeId, TreeNode<T>>,
    roots: Vec<NodeId>,
    next_id: usize,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            next_id: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.nodes.get(&id)
    }

    pub fn payload_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(&id).map(|node| &mut node.payload)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], |node| node.children.as_slice())
    }

    /// Insert a new node under `parent` (or as a root when `None`)
    ///
    /// Returns `None` if the parent does not exist.
    pub fn insert(&mut self, parent: Option<NodeId>, payload: T) -> Option<NodeId> {
        if let Some(parent_id) = parent
            && !self.nodes.contains_key(&parent_id)
        {
            return None;
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            TreeNode {
                id,
                parent,
                children: Vec::new(),
                payload,
            },
        );

        match parent {
            Some(parent_id) => {
                if let Some(node) = self.nodes.get_mut(&parent_id) {
                    node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        Some(id)
    }

    /// Remove a node and its whole subtree, returning the removed payloads
    /// in post-order
    pub fn remove(&mut self, id: NodeId) -> Vec<T> {
        if !self.nodes.contains_key(&id) {
            return Vec::new();
        }
        self.detach(id);

        let doomed = self.post_order_from(id);
        doomed
            .into_iter()
            .filter_map(|node_id| self.nodes.remove(&node_id))
            .map(|node| node.payload)
            .collect()
    }

    /// Remove all children of a node, keeping the node itself
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Remove every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    /// Number of ancestors between the node and its root
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent_id) = current {
            depth += 1;
            current = self.parent(parent_id);
        }
        depth
    }

    /// Pre-order ids of the whole forest
    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_pre_order(*root, &mut out);
        }
        out
    }

    /// Pre-order ids of the subtree rooted at `id`
    #[must_use]
    pub fn pre_order_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.nodes.contains_key(&id) {
            self.collect_pre_order(id, &mut out);
        }
        out
    }

    /// Post-order ids of the whole forest
    #[must_use]
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_post_order(*root, &mut out);
        }
        out
    }

    /// Post-order ids of the subtree rooted at `id`
    #[must_use]
    pub fn post_order_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.nodes.contains_key(&id) {
            self.collect_post_order(id, &mut out);
        }
        out
    }

    /// Ids of every node whose payload satisfies `predicate`, in pre-order
    pub fn find<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&T) -> bool,
    {
        self.pre_order()
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(|node| predicate(&node.payload)))
            .collect()
    }

    /// Walk the forest in pre-order
    pub fn accept(&self, visitor: &mut dyn TreeVisitor<T>) {
        for id in self.pre_order() {
            if let Some(node) = self.nodes.get(&id) {
                visitor.visit(node, self.depth(id));
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        match self.parent(id) {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }
    }

    fn collect_pre_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    fn collect_post_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.collect_post_order(*child, out);
            }
            out.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree<&'static str>, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let a = tree.insert(None, "a").unwrap();
        let b = tree.insert(Some(a), "b").unwrap();
        let c = tree.insert(Some(b), "c").unwrap();
        let d = tree.insert(Some(a), "d").unwrap();
        (tree, a, b, c, d)
    }

    #[test]
    fn test_insert_under_missing_parent_fails() {
        let mut tree: Tree<u8> = Tree::new();
        assert!(tree.insert(Some(NodeId(42)), 1).is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_pre_and_post_order() {
        let (tree, a, b, c, d) = sample();
        assert_eq!(tree.pre_order(), vec![a, b, c, d]);
        assert_eq!(tree.post_order(), vec![c, b, d, a]);
        assert_eq!(tree.pre_order_from(b), vec![b, c]);
    }

    #[test]
    fn test_remove_subtree_detaches_from_parent() {
        let (mut tree, a, b, _c, d) = sample();
        let removed = tree.remove(b);
        assert_eq!(removed, vec!["c", "b"]);
        assert_eq!(tree.children(a), &[d]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_remove_root() {
        let (mut tree, a, ..) = sample();
        tree.remove(a);
        assert!(tree.is_empty());
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn test_depth_and_find() {
        let (tree, _a, _b, c, _d) = sample();
        assert_eq!(tree.depth(c), 2);
        assert_eq!(tree.find(|p| *p == "c"), vec![c]);
    }

    #[test]
    fn test_clear_children_keeps_node() {
        let (mut tree, a, ..) = sample();
        tree.clear_children(a);
        assert_eq!(tree.len(), 1);
        assert!(tree.children(a).is_empty());
    }

    #[test]
    fn test_visitor_receives_depths() {
        struct Collect(Vec<(&'static str, usize)>);
        impl TreeVisitor<&'static str> for Collect {
            fn visit(&mut self, node: &TreeNode<&'static str>, depth: usize) {
                self.0.push((node.payload, depth));
            }
        }

        let (tree, ..) = sample();
        let mut visitor = Collect(Vec::new());
        tree.accept(&mut visitor);
        assert_eq!(visitor.0, vec![("a", 0), ("b", 1), ("c", 2), ("d", 1)]);
    }
}
