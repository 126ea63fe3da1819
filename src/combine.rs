//! Combiner - Artifact Assembly
//!
//! Same fragments, two persistence modes: one combined document stream, or
//! one file per fragment named by a sequential index.

use std::fs;
use std::path::{Path, PathBuf};

use regex_lite::Regex;
use tracing::debug;

use crate::error::PackageError;
use crate::package::{SPLIT_PATTERN, SPLIT_PREFIX, SPLIT_SUFFIX};
use crate::render::RenderedFragment;
use crate::walk::walk;

/// Boundary placed strictly between two emitted fragments.
pub const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// Join every non-suppressed fragment, in order.
pub fn combine(fragments: &[RenderedFragment]) -> String {
    emitted(fragments)
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

/// Split-mode file name for the `index`-th emitted fragment (1-based).
pub fn split_file_name(index: usize) -> String {
    format!("{SPLIT_PREFIX}{index}{SPLIT_SUFFIX}")
}

/// Write every non-suppressed fragment to its own file in `dir`.
///
/// Returns the written paths in fragment order.
pub fn write_split(fragments: &[RenderedFragment], dir: &Path) -> Result<Vec<PathBuf>, PackageError> {
    let mut written = Vec::new();
    for (i, fragment) in emitted(fragments).enumerate() {
        let path = dir.join(split_file_name(i + 1));
        fs::write(&path, &fragment.text).map_err(|e| PackageError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

/// Remove split-mode files below `dir`. Returns how many were deleted.
pub fn clear_rendered(dir: &Path) -> Result<usize, PackageError> {
    prune_rendered(dir, &[])
}

/// Remove split-mode files below `dir` except those listed in `keep`.
pub fn prune_rendered(dir: &Path, keep: &[PathBuf]) -> Result<usize, PackageError> {
    let pattern = split_pattern();
    let mut removed = 0;
    for entry in walk(dir)? {
        if !entry.is_dir && pattern.is_match(&entry.name) && !keep.contains(&entry.path) {
            fs::remove_file(&entry.path).map_err(|e| PackageError::io(&entry.path, e))?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "cleared stale rendered files");
    }
    Ok(removed)
}

/// Split-mode files directly in `dir`, ordered by their numeric index.
pub fn list_rendered(dir: &Path) -> Result<Vec<PathBuf>, PackageError> {
    let pattern = split_pattern();
    let reader = fs::read_dir(dir).map_err(|e| PackageError::io(dir, e))?;

    let mut found = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| PackageError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.is_match(&name) {
            continue;
        }
        found.push((split_index(&name), entry.path()));
    }
    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

fn emitted(fragments: &[RenderedFragment]) -> impl Iterator<Item = &RenderedFragment> {
    fragments.iter().filter(|f| !f.is_suppressed())
}

fn split_pattern() -> Regex {
    Regex::new(SPLIT_PATTERN).expect("split pattern is a valid regex")
}

fn split_index(name: &str) -> u64 {
    name.trim_start_matches(SPLIT_PREFIX)
        .trim_end_matches(SPLIT_SUFFIX)
        .parse()
        .unwrap_or(u64::MAX)
}
