//! The `Vfs` facade: tree + cursor + source, and the public operations.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{VfsError, VfsResult};

use super::loader::{self, LoadReport, LoadSource};
use super::node::{EntryType, FileContent, Node, NodeId, Permissions};
use super::tree::Tree;

/// Snapshot of one directory entry, as returned by listings and `stat`.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub name: String,
    pub entry_type: EntryType,
    pub permissions: Permissions,
    pub owner: String,
    pub group: String,
    pub size: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl EntryInfo {
    fn from_node(node: &Node) -> Self {
        Self {
            name: node.name().to_string(),
            entry_type: node.entry_type(),
            permissions: node.permissions().clone(),
            owner: node.owner().to_string(),
            group: node.group().to_string(),
            size: node.size(),
            created: node.created(),
            modified: node.modified(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// An in-memory virtual filesystem with a navigation cursor.
///
/// Construction never fails: if the source path is not a loadable archive,
/// the tree starts as the built-in default and the [`LoadReport`] says why.
/// The cursor always points at a live directory reachable from the root.
#[derive(Debug)]
pub struct Vfs {
    tree: Tree,
    cwd: NodeId,
    source: PathBuf,
    report: LoadReport,
}

impl Vfs {
    /// Load a VFS from an archive path (or fall back to the default tree).
    pub fn open(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let (tree, report) = loader::load(&source);
        let cwd = tree.root();
        Self {
            tree,
            cwd,
            source,
            report,
        }
    }

    /// A VFS with the default tree and no archive behind it.
    pub fn in_memory() -> Self {
        let tree = loader::default_tree();
        let cwd = tree.root();
        Self {
            tree,
            cwd,
            source: PathBuf::new(),
            report: LoadReport {
                source: LoadSource::Default,
                warnings: Vec::new(),
                files: 0,
                directories: 2,
            },
        }
    }

    /// Discard the tree and rebuild it from the original source. The cursor
    /// resets to the root. This is the only operation that replaces the
    /// whole tree; everything else mutates in place.
    pub fn reload(&mut self) {
        let (tree, report) = loader::load(&self.source);
        self.cwd = tree.root();
        self.tree = tree;
        self.report = report;
    }

    /// How the last load went.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Absolute path of the current directory (`/` for the root).
    pub fn current_path(&self) -> String {
        self.tree.path_of(self.cwd)
    }

    fn resolve(&self, path: &str) -> VfsResult<NodeId> {
        self.tree
            .resolve(self.cwd, path)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Move the cursor. Fails without moving it if the path is missing or
    /// names a file.
    pub fn change_directory(&mut self, path: &str) -> VfsResult<()> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        if !node.is_dir() {
            return Err(VfsError::NotADirectory(path.to_string()));
        }
        self.cwd = target;
        Ok(())
    }

    /// List a directory (the current one for an empty path).
    pub fn list_directory(&self, path: &str) -> VfsResult<Vec<EntryInfo>> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        let children = node
            .children()
            .ok_or_else(|| VfsError::NotADirectory(path.to_string()))?;
        Ok(children
            .values()
            .filter_map(|id| self.tree.get(*id))
            .map(EntryInfo::from_node)
            .collect())
    }

    /// Read a file's content. Fails if the path is missing or a directory.
    pub fn read_file(&self, path: &str) -> VfsResult<&FileContent> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        node.content()
            .ok_or_else(|| VfsError::IsADirectory(path.to_string()))
    }

    /// Metadata for a file or directory.
    pub fn stat(&self, path: &str) -> VfsResult<EntryInfo> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        Ok(EntryInfo::from_node(node))
    }

    /// Create a directory under an existing parent.
    pub fn create_directory(&mut self, path: &str) -> VfsResult<()> {
        let (parent, name) = self.resolve_parent(path)?;
        self.tree.add_child(parent, Node::directory(name))?;
        Ok(())
    }

    /// Create a file under an existing parent.
    pub fn create_file(&mut self, path: &str, content: FileContent) -> VfsResult<()> {
        let (parent, name) = self.resolve_parent(path)?;
        self.tree.add_child(parent, Node::file(name, content))?;
        Ok(())
    }

    /// Replace an existing file's content.
    pub fn update_file(&mut self, path: &str, content: FileContent) -> VfsResult<()> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get_mut(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        node.update_content(content)
    }

    /// Remove a file or directory; directories go with their whole subtree.
    ///
    /// If the cursor was inside the removed subtree it moves to the removed
    /// node's parent, so it always stays live.
    pub fn remove(&mut self, path: &str) -> VfsResult<()> {
        let target = self.resolve(path)?;
        if target == self.tree.root() {
            return Err(VfsError::RootProtected);
        }
        let parent = self
            .tree
            .parent(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        let name = self
            .tree
            .get(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?
            .name()
            .to_string();

        if self.tree.is_ancestor(target, self.cwd) {
            self.cwd = parent;
        }
        self.tree.remove_child(parent, &name)
    }

    /// Rename a file or directory in place.
    pub fn rename(&mut self, path: &str, new_name: &str) -> VfsResult<()> {
        let target = self.resolve(path)?;
        self.tree.rename(target, new_name)
    }

    /// Set a node's permission string.
    pub fn change_permissions(&mut self, path: &str, permissions: &str) -> VfsResult<()> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get_mut(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        node.change_permissions(permissions)
    }

    /// Set a node's owner (and optionally group).
    pub fn change_owner(&mut self, path: &str, owner: &str, group: Option<&str>) -> VfsResult<()> {
        let target = self.resolve(path)?;
        let node = self
            .tree
            .get_mut(target)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        node.change_owner(owner, group)
    }

    /// Split a path into (resolved parent directory, final name).
    fn resolve_parent(&self, path: &str) -> VfsResult<(NodeId, String)> {
        let trimmed = path.trim_end_matches('/');
        let (parent_path, name) = match trimmed.rfind('/') {
            Some(0) => ("/", &trimmed[1..]),
            Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
            None => ("", trimmed),
        };
        if name.is_empty() || name == "." || name == ".." {
            return Err(VfsError::InvalidName(path.to_string()));
        }
        let parent = self.resolve(parent_path)?;
        let parent_node = self
            .tree
            .get(parent)
            .ok_or_else(|| VfsError::NotFound(parent_path.to_string()))?;
        if !parent_node.is_dir() {
            return Err(VfsError::NotADirectory(parent_path.to_string()));
        }
        Ok((parent, name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FileContent {
        FileContent::Text(s.to_string())
    }

    /// Default tree (`/home/user`) plus a few entries created through the API.
    fn sample_vfs() -> Vfs {
        let mut vfs = Vfs::in_memory();
        vfs.create_directory("/etc").unwrap();
        vfs.create_file("/etc/motd", text("welcome")).unwrap();
        vfs.create_file("/home/user/notes.txt", text("hi")).unwrap();
        vfs
    }

    #[test]
    fn test_cd_pwd_round_trip() {
        let mut vfs = sample_vfs();
        assert_eq!(vfs.current_path(), "/");

        vfs.change_directory("/home//user/").unwrap();
        assert_eq!(vfs.current_path(), "/home/user");

        vfs.change_directory("..").unwrap();
        assert_eq!(vfs.current_path(), "/home");

        vfs.change_directory("/").unwrap();
        assert_eq!(vfs.current_path(), "/");
    }

    #[test]
    fn test_cd_failure_leaves_cursor() {
        let mut vfs = sample_vfs();
        vfs.change_directory("/etc").unwrap();

        let err = vfs.change_directory("/nope/nothing").unwrap_err();
        assert_eq!(err, VfsError::NotFound("/nope/nothing".to_string()));
        assert_eq!(vfs.current_path(), "/etc");

        let err = vfs.change_directory("/etc/motd").unwrap_err();
        assert_eq!(err, VfsError::NotADirectory("/etc/motd".to_string()));
        assert_eq!(vfs.current_path(), "/etc");
    }

    #[test]
    fn test_list_directory() {
        let vfs = sample_vfs();
        let entries = vfs.list_directory("/").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["etc", "home"]);

        let entries = vfs.list_directory("/etc").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "motd");
        assert_eq!(entries[0].entry_type, EntryType::File);
        assert_eq!(entries[0].size, 7);

        assert!(matches!(
            vfs.list_directory("/etc/motd"),
            Err(VfsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_empty_path_lists_current_directory() {
        let mut vfs = sample_vfs();
        vfs.change_directory("/etc").unwrap();
        let entries = vfs.list_directory("").unwrap();
        assert_eq!(entries[0].name, "motd");
    }

    #[test]
    fn test_read_file() {
        let vfs = sample_vfs();
        assert_eq!(vfs.read_file("/etc/motd").unwrap(), &text("welcome"));
        assert!(matches!(
            vfs.read_file("/etc"),
            Err(VfsError::IsADirectory(_))
        ));
        assert!(matches!(
            vfs.read_file("/etc/ghost"),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_binary_round_trip() {
        let mut vfs = sample_vfs();
        let bytes = vec![0x00, 0x01, 0xfe, 0xff];
        vfs.create_file("/blob.bin", FileContent::Binary(bytes.clone()))
            .unwrap();

        let content = vfs.read_file("/blob.bin").unwrap();
        assert!(content.is_binary());
        assert_eq!(content.as_bytes(), bytes.as_slice());

        let updated = vec![0xde, 0xad, 0xbe, 0xef, 0x00];
        vfs.update_file("/blob.bin", FileContent::Binary(updated.clone()))
            .unwrap();
        assert_eq!(vfs.read_file("/blob.bin").unwrap().as_bytes(), &updated);
        assert_eq!(vfs.stat("/blob.bin").unwrap().size, 5);
    }

    #[test]
    fn test_remove_subtree_unreachable() {
        let mut vfs = sample_vfs();
        vfs.create_directory("/home/user/docs").unwrap();
        vfs.create_file("/home/user/docs/a.txt", text("a")).unwrap();

        vfs.remove("/home/user").unwrap();
        assert!(vfs.stat("/home/user").is_err());
        assert!(vfs.stat("/home/user/docs").is_err());
        assert!(vfs.stat("/home/user/docs/a.txt").is_err());
        assert!(vfs.stat("/home").is_ok());
    }

    #[test]
    fn test_remove_under_cursor_moves_cursor() {
        let mut vfs = sample_vfs();
        vfs.create_directory("/home/user/docs").unwrap();
        vfs.change_directory("/home/user/docs").unwrap();

        vfs.remove("/home/user").unwrap();
        // Cursor moved to the removed node's parent
        assert_eq!(vfs.current_path(), "/home");
    }

    #[test]
    fn test_remove_root_rejected() {
        let mut vfs = sample_vfs();
        assert_eq!(vfs.remove("/"), Err(VfsError::RootProtected));
        assert_eq!(vfs.remove("/etc/.."), Err(VfsError::RootProtected));
    }

    #[test]
    fn test_rename() {
        let mut vfs = sample_vfs();
        vfs.rename("/etc/motd", "banner").unwrap();
        assert!(vfs.stat("/etc/motd").is_err());
        assert_eq!(vfs.read_file("/etc/banner").unwrap(), &text("welcome"));
    }

    #[test]
    fn test_create_errors() {
        let mut vfs = sample_vfs();
        assert!(matches!(
            vfs.create_file("/etc/motd", text("dup")),
            Err(VfsError::AlreadyExists(_))
        ));
        assert!(matches!(
            vfs.create_file("/missing/f.txt", text("")),
            Err(VfsError::NotFound(_))
        ));
        assert!(matches!(
            vfs.create_file("/etc/motd/f.txt", text("")),
            Err(VfsError::NotADirectory(_))
        ));
        assert!(matches!(
            vfs.create_directory("/etc/."),
            Err(VfsError::InvalidName(_))
        ));
    }

    #[test]
    fn test_relative_create() {
        let mut vfs = sample_vfs();
        vfs.change_directory("/home/user").unwrap();
        vfs.create_file("todo.txt", text("later")).unwrap();
        assert!(vfs.stat("/home/user/todo.txt").is_ok());
    }

    #[test]
    fn test_permissions_through_facade() {
        let mut vfs = sample_vfs();
        vfs.change_permissions("/etc/motd", "rwxr-xr-x").unwrap();
        assert_eq!(vfs.stat("/etc/motd").unwrap().permissions.as_str(), "rwxr-xr-x");

        assert!(vfs.change_permissions("/etc/motd", "rwx").is_err());
        assert!(vfs.change_permissions("/etc/motd", "rwxrwxrwq").is_err());
        assert_eq!(vfs.stat("/etc/motd").unwrap().permissions.as_str(), "rwxr-xr-x");
    }

    #[test]
    fn test_open_missing_archive_is_usable() {
        let vfs = Vfs::open("/no/such/thing.zip");
        assert_eq!(vfs.load_report().source, LoadSource::Default);
        assert!(!vfs.load_report().is_clean());
        assert!(vfs.stat("/home/user").is_ok());
    }

    #[test]
    fn test_reload_resets_tree_and_cursor() {
        let mut vfs = Vfs::open("/no/such/thing.zip");
        vfs.create_directory("/scratch").unwrap();
        vfs.change_directory("/scratch").unwrap();

        vfs.reload();
        assert_eq!(vfs.current_path(), "/");
        // In-memory mutations are gone; the default tree is back
        assert!(vfs.stat("/scratch").is_err());
        assert!(vfs.stat("/home/user").is_ok());
    }
}
