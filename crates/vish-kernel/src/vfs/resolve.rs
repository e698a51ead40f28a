//! Path resolution against the tree.
//!
//! Paths use `/` as separator regardless of host platform. A leading `/`
//! anchors resolution at the root; anything else resolves relative to the
//! caller's cursor. Consecutive separators and empty components are
//! discarded, so `/a//b/` and `/a/b` name the same node.

use super::node::NodeId;
use super::tree::Tree;

/// Split a path into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

impl Tree {
    /// Resolve `path` to a node, starting from `from` for relative paths.
    ///
    /// `.` is a no-op, `..` moves to the parent (staying put at the root),
    /// and any other component must exactly match a child name. A missing
    /// component fails the whole path; so does walking through a file.
    pub fn resolve(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let mut current = if path.starts_with('/') {
            self.root()
        } else {
            from
        };

        for component in components(path) {
            match component {
                "." => {}
                ".." => current = self.parent(current).unwrap_or(current),
                name => current = self.get(current)?.children()?.get(name).copied()?,
            }
        }
        Some(current)
    }

    /// Reconstruct the absolute path of a node by walking the parent index
    /// up to the root. The root renders as `/` alone.
    pub fn path_of(&self, id: NodeId) -> String {
        if id == self.root() {
            return "/".to_string();
        }

        let mut parts = Vec::new();
        let mut current = id;
        while current != self.root() {
            let Some(node) = self.get(current) else {
                break;
            };
            parts.push(node.name().to_string());
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }
}
