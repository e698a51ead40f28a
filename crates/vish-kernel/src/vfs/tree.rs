//! Arena-backed tree of nodes.
//!
//! Nodes are owned by the arena and reference each other by `NodeId`; a
//! directory's children map holds ids, and a separate parent index maps each
//! non-root node back to its directory. The parent index is non-owning, so
//! ownership flows strictly downward while `..` and path reconstruction stay
//! O(1) per step.

use std::collections::HashMap;

use crate::error::{VfsError, VfsResult};

use super::node::{validate_name, Node, NodeId};

/// The virtual filesystem tree.
///
/// The root is a directory named `/`; it always exists and can never be
/// renamed or removed.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    /// Parent index: child id → directory id. Covers exactly the non-root
    /// live nodes.
    parents: HashMap<NodeId, NodeId>,
    root: NodeId,
    next_id: u64,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree containing only the root directory.
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::directory("/"));
        Self {
            nodes,
            parents: HashMap::new(),
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the root always exists
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Parent of a node; `None` for the root (and for dead ids).
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Look up a direct child of a directory by name.
    pub fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.get(dir)?.children()?.get(name).copied()
    }

    // Internal accessors for ids the tree handed out itself.
    // A live id is an invariant: ids only leave the maps through `remove_child`.
    fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(&id).expect("live node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(&id).expect("live node id")
    }

    /// Attach a node as a child of `parent`.
    ///
    /// Fails if `parent` is not a directory or already has a child with that
    /// name; on failure nothing changes. Bumps the parent's modified time.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> VfsResult<NodeId> {
        validate_name(node.name())?;
        let name = node.name().to_string();
        {
            let parent_node = self
                .nodes
                .get(&parent)
                .ok_or_else(|| VfsError::NotFound(name.clone()))?;
            let children = parent_node
                .children()
                .ok_or_else(|| VfsError::NotADirectory(parent_node.name().to_string()))?;
            if children.contains_key(&name) {
                return Err(VfsError::AlreadyExists(name));
            }
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.parents.insert(id, parent);
        let parent_node = self.node_mut(parent);
        parent_node
            .children_mut()
            .expect("checked directory above")
            .insert(name, id);
        parent_node.touch();
        Ok(id)
    }

    /// Remove a named child of `parent`, dropping its entire subtree.
    ///
    /// Fails if `parent` is not a directory or the name is absent. Bumps the
    /// parent's modified time.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> VfsResult<()> {
        let child = {
            let parent_node = self
                .nodes
                .get(&parent)
                .ok_or_else(|| VfsError::NotFound(name.to_string()))?;
            let children = parent_node
                .children()
                .ok_or_else(|| VfsError::NotADirectory(parent_node.name().to_string()))?;
            *children
                .get(name)
                .ok_or_else(|| VfsError::NotFound(name.to_string()))?
        };

        let parent_node = self.node_mut(parent);
        parent_node
            .children_mut()
            .expect("checked directory above")
            .remove(name);
        parent_node.touch();

        // Drop the subtree and its parent-index entries.
        let mut stack = vec![child];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                self.parents.remove(&id);
                if let Some(children) = node.children() {
                    stack.extend(children.values().copied());
                }
            }
        }
        Ok(())
    }

    /// Rename a node, re-keying its parent's children map.
    ///
    /// Fails on the root, on invalid names, and when a sibling already uses
    /// the new name; the tree is unchanged on failure.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> VfsResult<()> {
        if id == self.root {
            return Err(VfsError::RootProtected);
        }
        validate_name(new_name)?;
        let parent = self
            .parent(id)
            .ok_or_else(|| VfsError::NotFound(new_name.to_string()))?;

        let old_name = self.node(id).name().to_string();
        if old_name == new_name {
            return Ok(());
        }
        if self.child(parent, new_name).is_some() {
            return Err(VfsError::AlreadyExists(new_name.to_string()));
        }

        self.node_mut(id)
            .rename(new_name)
            .expect("name validated above");
        let children = self
            .node_mut(parent)
            .children_mut()
            .expect("parent index points at a directory");
        children.remove(&old_name);
        children.insert(new_name.to_string(), id);
        Ok(())
    }

    /// True when `ancestor` lies on the parent chain of `id` (or equals it).
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.parent(cur);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::node::FileContent;

    fn text(s: &str) -> FileContent {
        FileContent::Text(s.to_string())
    }

    #[test]
    fn test_root_exists() {
        let tree = Tree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.get(tree.root()).unwrap().is_dir());
        assert_eq!(tree.get(tree.root()).unwrap().name(), "/");
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_add_and_lookup() {
        let mut tree = Tree::new();
        let home = tree.add_child(tree.root(), Node::directory("home")).unwrap();
        let file = tree.add_child(home, Node::file("a.txt", text("hi"))).unwrap();

        assert_eq!(tree.child(tree.root(), "home"), Some(home));
        assert_eq!(tree.child(home, "a.txt"), Some(file));
        assert_eq!(tree.parent(file), Some(home));
        assert_eq!(tree.parent(home), Some(tree.root()));
    }

    #[test]
    fn test_add_duplicate_name_fails() {
        let mut tree = Tree::new();
        tree.add_child(tree.root(), Node::directory("home")).unwrap();
        let result = tree.add_child(tree.root(), Node::directory("home"));
        assert_eq!(result, Err(VfsError::AlreadyExists("home".to_string())));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_add_child_to_file_fails() {
        let mut tree = Tree::new();
        let file = tree
            .add_child(tree.root(), Node::file("a.txt", text("")))
            .unwrap();
        let result = tree.add_child(file, Node::directory("sub"));
        assert!(matches!(result, Err(VfsError::NotADirectory(_))));
    }

    #[test]
    fn test_remove_drops_whole_subtree() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root(), Node::directory("a")).unwrap();
        let b = tree.add_child(a, Node::directory("b")).unwrap();
        let c = tree.add_child(b, Node::file("c.txt", text("x"))).unwrap();
        assert_eq!(tree.len(), 4);

        tree.remove_child(tree.root(), "a").unwrap();
        assert_eq!(tree.len(), 1);
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert!(!tree.contains(c));
        // Parent index cleaned up too
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.parent(c), None);
    }

    #[test]
    fn test_remove_missing_name_fails() {
        let mut tree = Tree::new();
        let result = tree.remove_child(tree.root(), "ghost");
        assert_eq!(result, Err(VfsError::NotFound("ghost".to_string())));
    }

    #[test]
    fn test_rename_rekeys_parent() {
        let mut tree = Tree::new();
        let a = tree
            .add_child(tree.root(), Node::file("old.txt", text("x")))
            .unwrap();

        tree.rename(a, "new.txt").unwrap();
        assert_eq!(tree.child(tree.root(), "old.txt"), None);
        assert_eq!(tree.child(tree.root(), "new.txt"), Some(a));
        assert_eq!(tree.get(a).unwrap().name(), "new.txt");
    }

    #[test]
    fn test_rename_conflict_fails() {
        let mut tree = Tree::new();
        let a = tree
            .add_child(tree.root(), Node::file("a.txt", text("")))
            .unwrap();
        tree.add_child(tree.root(), Node::file("b.txt", text("")))
            .unwrap();

        let result = tree.rename(a, "b.txt");
        assert_eq!(result, Err(VfsError::AlreadyExists("b.txt".to_string())));
        assert_eq!(tree.get(a).unwrap().name(), "a.txt");
    }

    #[test]
    fn test_rename_root_fails() {
        let mut tree = Tree::new();
        let result = tree.rename(tree.root(), "not-root");
        assert_eq!(result, Err(VfsError::RootProtected));
    }

    #[test]
    fn test_is_ancestor() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root(), Node::directory("a")).unwrap();
        let b = tree.add_child(a, Node::directory("b")).unwrap();
        let other = tree.add_child(tree.root(), Node::directory("c")).unwrap();

        assert!(tree.is_ancestor(tree.root(), b));
        assert!(tree.is_ancestor(a, b));
        assert!(tree.is_ancestor(b, b));
        assert!(!tree.is_ancestor(b, a));
        assert!(!tree.is_ancestor(other, b));
    }
}
