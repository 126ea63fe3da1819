//! Deterministic directory traversal.
//!
//! Depth-first, pre-order, entries sorted by file name at every level. Driven
//! by an explicit worklist so the visiting order is easy to audit. Names
//! must be valid UTF-8: they become template names and checksum input.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PackageError;

/// One visited entry below the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the walk root, `/` separated.
    pub relative: String,
    /// Last path component.
    pub name: String,
    pub is_dir: bool,
}

/// Walk the tree below `root`. The root itself is not yielded.
///
/// Symlinks are not followed into; a symlink is reported as a non-directory.
pub fn walk(root: &Path) -> Result<Vec<WalkEntry>, PackageError> {
    let mut visited = Vec::new();
    let mut pending: Vec<WalkEntry> = read_sorted(root, "")?;
    pending.reverse();

    while let Some(entry) = pending.pop() {
        if entry.is_dir {
            let mut children = read_sorted(&entry.path, &entry.relative)?;
            children.reverse();
            pending.extend(children);
        }
        visited.push(entry);
    }

    Ok(visited)
}

fn read_sorted(dir: &Path, prefix: &str) -> Result<Vec<WalkEntry>, PackageError> {
    let reader = fs::read_dir(dir).map_err(|e| PackageError::io(dir, e))?;
    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| PackageError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| PackageError::io(entry.path(), e))?;
        let name = entry.file_name().into_string().map_err(|raw| {
            PackageError::io(
                entry.path(),
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name {raw:?} is not valid UTF-8"),
                ),
            )
        })?;
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        entries.push(WalkEntry {
            path: entry.path(),
            relative,
            name,
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
