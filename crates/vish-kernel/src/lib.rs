//! vish-kernel: the core of the vish shell emulator.
//!
//! This crate provides:
//!
//! - **VFS**: an in-memory filesystem tree loaded from a zip archive, with
//!   path resolution, navigation, and mutation
//! - **Shell**: the line-oriented command layer (tokenizing, variable
//!   expansion, dispatch) on top of the VFS
//! - **Errors**: the `VfsError` taxonomy every operation reports through
//!
//! The binary crate (`vish-repl`) adds the terminal loop, CLI parsing, and
//! the CSV audit log on top of this.

pub mod error;
pub mod shell;
pub mod vfs;

pub use error::{VfsError, VfsResult};
pub use shell::{CommandOutcome, Shell};
pub use vfs::{EntryInfo, EntryType, FileContent, LoadReport, LoadSource, Vfs};
