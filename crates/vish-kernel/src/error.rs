//! Error types for VFS operations.

use thiserror::Error;

/// Result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS operation errors.
///
/// Every failure a tree operation can produce. Callers render these as
/// user-facing error lines (e.g. `cd: /nope: No such file or directory`);
/// none of them is fatal and none of them leaves the tree half-mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("invalid permission string: {0:?}")]
    InvalidPermissions(String),
    #[error("the root directory cannot be renamed or removed")]
    RootProtected,
}
