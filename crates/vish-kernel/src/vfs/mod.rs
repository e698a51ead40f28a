//! Virtual filesystem for vish.
//!
//! The tree lives entirely in memory and is populated once from a zip
//! archive (or a built-in default when no archive is usable):
//!
//! - **node**: the `Node` model — metadata plus the file/directory tag
//! - **tree**: arena ownership, structural mutation, the parent index
//! - **resolve**: path splitting, `.`/`..` walking, path reconstruction
//! - **loader**: two-pass zip ingestion with non-fatal degradation
//! - **system**: the `Vfs` facade (tree + cursor) the shell talks to
//!
//! Nothing here touches the process environment, the terminal, or the log
//! file; the core returns results and errors, callers render and log them.

mod loader;
mod node;
mod resolve;
mod system;
mod tree;

pub use loader::{is_zip_archive, LoadReport, LoadSource};
pub use node::{EntryType, FileContent, Node, NodeId, Permissions};
pub use resolve::components;
pub use system::{EntryInfo, Vfs};
pub use tree::Tree;
