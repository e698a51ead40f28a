//! Node model: a single file or directory in the virtual tree.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use crate::error::{VfsError, VfsResult};

/// Identifier of a node in the tree arena.
///
/// Ids are never reused within one tree; a dangling id simply fails lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// A nine-character `rwx` permission string, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions(String);

impl Permissions {
    /// Default permissions for files.
    pub const FILE_DEFAULT: &'static str = "rw-r--r--";
    /// Default permissions for directories.
    pub const DIRECTORY_DEFAULT: &'static str = "rwxr-xr-x";

    /// Validate and wrap a permission string.
    ///
    /// The string must be exactly 9 characters drawn from `{r,w,x,-}`.
    pub fn new(s: &str) -> VfsResult<Self> {
        if s.len() != 9 || !s.chars().all(|c| matches!(c, 'r' | 'w' | 'x' | '-')) {
            return Err(VfsError::InvalidPermissions(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    fn file_default() -> Self {
        Self(Self::FILE_DEFAULT.to_string())
    }

    fn directory_default() -> Self {
        Self(Self::DIRECTORY_DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File payload: UTF-8 text or raw bytes.
///
/// The tag is the single source of truth for "is this binary"; there is no
/// separate flag that could disagree with the payload, and `len` is always
/// the decoded byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    /// Classify raw bytes: valid UTF-8 becomes `Text`, anything else `Binary`.
    pub fn from_bytes(raw: Vec<u8>) -> Self {
        match String::from_utf8(raw) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Binary(err.into_bytes()),
        }
    }

    /// Decoded byte length.
    pub fn len(&self) -> u64 {
        match self {
            Self::Text(s) => s.len() as u64,
            Self::Binary(b) => b.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// The payload as raw bytes, regardless of variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

/// Type of a node, as shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// The tagged half of a node: file payload or directory children.
///
/// Children map name to the child's arena id; the map keys always equal the
/// child nodes' own names (the tree maintains this on every mutation).
#[derive(Debug, Clone)]
pub enum NodeKind {
    File { content: FileContent },
    Directory { children: BTreeMap<String, NodeId> },
}

/// A single entry in the virtual filesystem.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    permissions: Permissions,
    owner: String,
    group: String,
    created: SystemTime,
    modified: SystemTime,
    kind: NodeKind,
}

/// Check that a string is usable as a node name.
///
/// Empty names, names containing the path separator, and the reserved
/// `.`/`..` components are rejected.
pub(crate) fn validate_name(name: &str) -> VfsResult<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(VfsError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl Node {
    /// Create a file node with default metadata.
    pub fn file(name: impl Into<String>, content: FileContent) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            permissions: Permissions::file_default(),
            owner: "user".to_string(),
            group: "user".to_string(),
            created: now,
            modified: now,
            kind: NodeKind::File { content },
        }
    }

    /// Create an empty directory node with default metadata.
    pub fn directory(name: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            permissions: Permissions::directory_default(),
            owner: "user".to_string(),
            group: "user".to_string(),
            created: now,
            modified: now,
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn entry_type(&self) -> EntryType {
        match self.kind {
            NodeKind::File { .. } => EntryType::File,
            NodeKind::Directory { .. } => EntryType::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Decoded byte size for files, 0 for directories.
    pub fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::File { content } => content.len(),
            NodeKind::Directory { .. } => 0,
        }
    }

    /// File payload, or `None` for directories.
    pub fn content(&self) -> Option<&FileContent> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Children of a directory, or `None` for files.
    pub fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, NodeId>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// Replace a file's content. Fails on directories; the size invariant
    /// holds by construction because the content carries its own length.
    pub fn update_content(&mut self, content: FileContent) -> VfsResult<()> {
        match &mut self.kind {
            NodeKind::File { content: current } => {
                *current = content;
                self.touch();
                Ok(())
            }
            NodeKind::Directory { .. } => Err(VfsError::IsADirectory(self.name.clone())),
        }
    }

    /// Set a new name. The caller (the tree) is responsible for re-keying the
    /// parent's children map to match.
    pub fn rename(&mut self, new_name: &str) -> VfsResult<()> {
        validate_name(new_name)?;
        self.name = new_name.to_string();
        self.touch();
        Ok(())
    }

    /// Replace the permission string; rejects malformed input unchanged.
    pub fn change_permissions(&mut self, new_permissions: &str) -> VfsResult<()> {
        self.permissions = Permissions::new(new_permissions)?;
        self.touch();
        Ok(())
    }

    /// Change the owner, and optionally the group.
    pub fn change_owner(&mut self, owner: &str, group: Option<&str>) -> VfsResult<()> {
        if owner.is_empty() {
            return Err(VfsError::InvalidName(owner.to_string()));
        }
        self.owner = owner.to_string();
        if let Some(group) = group {
            self.group = group.to_string();
        }
        self.touch();
        Ok(())
    }

    pub(crate) fn touch(&mut self) {
        self.modified = SystemTime::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_sniffing() {
        assert_eq!(
            FileContent::from_bytes(b"hello".to_vec()),
            FileContent::Text("hello".to_string())
        );

        let raw = vec![0x00, 0xff, 0xfe, 0x01];
        let content = FileContent::from_bytes(raw.clone());
        assert_eq!(content, FileContent::Binary(raw));
    }

    #[test]
    fn test_size_is_decoded_length() {
        let node = Node::file("blob.bin", FileContent::Binary(vec![0u8; 100]));
        assert_eq!(node.size(), 100);

        let node = Node::file("note.txt", FileContent::Text("héllo".to_string()));
        // UTF-8 byte length, not char count
        assert_eq!(node.size(), 6);
    }

    #[test]
    fn test_update_content_fails_on_directory() {
        let mut dir = Node::directory("docs");
        let result = dir.update_content(FileContent::Text("x".to_string()));
        assert_eq!(result, Err(VfsError::IsADirectory("docs".to_string())));
    }

    #[test]
    fn test_update_content_bumps_modified() {
        let mut file = Node::file("a.txt", FileContent::Text(String::new()));
        let before = file.modified();
        std::thread::sleep(std::time::Duration::from_millis(5));
        file.update_content(FileContent::Text("new".to_string()))
            .unwrap();
        assert!(file.modified() > before);
        assert_eq!(file.size(), 3);
    }

    #[test]
    fn test_rename_validation() {
        let mut file = Node::file("a.txt", FileContent::Text(String::new()));
        assert!(file.rename("b.txt").is_ok());
        assert_eq!(file.name(), "b.txt");

        assert!(file.rename("").is_err());
        assert!(file.rename("a/b").is_err());
        assert!(file.rename("..").is_err());
        // Name unchanged after failed renames
        assert_eq!(file.name(), "b.txt");
    }

    #[test]
    fn test_permission_validation() {
        let mut file = Node::file("a.txt", FileContent::Text(String::new()));
        assert!(file.change_permissions("rwxr-xr-x").is_ok());
        assert_eq!(file.permissions().as_str(), "rwxr-xr-x");

        // Wrong length
        assert!(file.change_permissions("rwx").is_err());
        // Invalid character
        assert!(file.change_permissions("rwxrwxrwq").is_err());
        // Unchanged after failed attempts
        assert_eq!(file.permissions().as_str(), "rwxr-xr-x");
    }

    #[test]
    fn test_defaults() {
        let file = Node::file("a.txt", FileContent::Text(String::new()));
        assert_eq!(file.permissions().as_str(), "rw-r--r--");
        assert_eq!(file.owner(), "user");
        assert_eq!(file.group(), "user");

        let dir = Node::directory("d");
        assert_eq!(dir.permissions().as_str(), "rwxr-xr-x");
        assert_eq!(dir.size(), 0);
    }

    #[test]
    fn test_change_owner() {
        let mut file = Node::file("a.txt", FileContent::Text(String::new()));
        file.change_owner("alice", None).unwrap();
        assert_eq!(file.owner(), "alice");
        assert_eq!(file.group(), "user");

        file.change_owner("bob", Some("staff")).unwrap();
        assert_eq!(file.group(), "staff");

        assert!(file.change_owner("", None).is_err());
    }
}
