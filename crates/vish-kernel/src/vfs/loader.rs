//! Archive ingestion: build a tree from a zip file.
//!
//! Loading never fails. A missing, unreadable, or malformed archive degrades
//! to the minimal default tree, and everything worth telling the user about
//! lands in the returned [`LoadReport`] instead of being printed here.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::node::{FileContent, Node, NodeId};
use super::resolve::components;
use super::tree::Tree;

/// First four bytes of a zip local file header.
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Where a loaded tree came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Populated from the archive at this path.
    Archive(PathBuf),
    /// The built-in default tree (no usable archive).
    Default,
}

/// Outcome of a load: the source actually used plus any warnings.
///
/// Warnings cover skipped entries and the reason for falling back to the
/// default tree; an empty list means a clean load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub source: LoadSource,
    pub warnings: Vec<String>,
    /// File entries attached.
    pub files: usize,
    /// Directory nodes created.
    pub directories: usize,
}

impl LoadReport {
    fn new() -> Self {
        Self {
            source: LoadSource::Default,
            warnings: Vec::new(),
            files: 0,
            directories: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Decide whether `path` should be treated as a zip archive: either the
/// filename ends in `.zip`, or the file starts with the zip magic bytes.
pub fn is_zip_archive(path: &Path) -> bool {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return true;
    }
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut signature = [0u8; 4];
    match file.read_exact(&mut signature) {
        Ok(()) => signature == ZIP_MAGIC,
        Err(_) => false,
    }
}

/// Build a tree from `source`.
///
/// Returns the populated tree and a report. On any failure the tree is the
/// default one and the report says why.
pub fn load(source: &Path) -> (Tree, LoadReport) {
    let mut report = LoadReport::new();

    if !is_zip_archive(source) {
        tracing::debug!(path = %source.display(), "not a zip archive, using default tree");
        report.warnings.push(format!(
            "{}: not a zip archive, starting with the default tree",
            source.display()
        ));
        return (default_tree(), report);
    }

    match read_archive(source, &mut report) {
        Ok(tree) => {
            tracing::debug!(
                path = %source.display(),
                files = report.files,
                directories = report.directories,
                "archive loaded"
            );
            report.source = LoadSource::Archive(source.to_path_buf());
            (tree, report)
        }
        Err(err) => {
            tracing::warn!(path = %source.display(), error = %err, "archive load failed");
            report
                .warnings
                .push(format!("{}: {err}, starting with the default tree", source.display()));
            (default_tree(), report)
        }
    }
}

/// The fallback tree: `/home/user`, nothing else.
pub fn default_tree() -> Tree {
    let mut tree = Tree::new();
    let home = tree
        .add_child(tree.root(), Node::directory("home"))
        .expect("fresh tree has no conflicting children");
    tree.add_child(home, Node::directory("user"))
        .expect("fresh tree has no conflicting children");
    tree
}

fn read_archive(path: &Path, report: &mut LoadReport) -> std::io::Result<Tree> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(std::io::Error::other)?;
    let mut tree = Tree::new();
    populate(&mut tree, &mut archive, report)?;
    Ok(tree)
}

/// Two passes: directories first, then files. Archive entries are unordered,
/// so a file's parent chain is only guaranteed to exist after pass one.
fn populate<R: Read + Seek>(
    tree: &mut Tree,
    archive: &mut ZipArchive<R>,
    report: &mut LoadReport,
) -> std::io::Result<()> {
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(std::io::Error::other)?;
        if entry.is_dir() {
            ensure_directories(tree, entry.name(), report);
        }
    }

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(std::io::Error::other)?;
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let parts: Vec<&str> = components(&entry_name).collect();
        let Some((file_name, parent_parts)) = parts.split_last() else {
            continue;
        };

        // Strict two-pass: a file whose parent directory was never declared
        // is skipped with a warning, not synthesized.
        let Some(parent) = walk_existing(tree, parent_parts) else {
            report.warnings.push(format!(
                "{entry_name}: parent directory not present in archive, entry skipped"
            ));
            continue;
        };

        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        let node = Node::file(*file_name, FileContent::from_bytes(raw));
        match tree.add_child(parent, node) {
            Ok(_) => report.files += 1,
            Err(err) => report
                .warnings
                .push(format!("{entry_name}: {err}, entry skipped")),
        }
    }
    Ok(())
}

/// Create the directory chain named by a directory entry, reusing whatever
/// already exists along the way.
fn ensure_directories(tree: &mut Tree, entry_name: &str, report: &mut LoadReport) {
    let mut current = tree.root();
    for part in components(entry_name) {
        current = match tree.child(current, part) {
            Some(existing) => existing,
            None => match tree.add_child(current, Node::directory(part)) {
                Ok(id) => {
                    report.directories += 1;
                    id
                }
                Err(err) => {
                    // A file entry is squatting on the directory's name.
                    report
                        .warnings
                        .push(format!("{entry_name}: {err}, entry skipped"));
                    return;
                }
            },
        };
    }
}

/// Follow `parts` through existing directories only; `None` on any gap.
fn walk_existing(tree: &Tree, parts: &[&str]) -> Option<NodeId> {
    let mut current = tree.root();
    for part in parts {
        current = tree.child(current, part)?;
        if !tree.get(current)?.is_dir() {
            return None;
        }
    }
    Some(current)
}
