//! Checksum Engine - SHA-256 Over a Package Tree
//!
//! One accumulator is fed, per entry in walk order, the file content (files
//! only) followed by the entry's root-relative path. The hex digest is stored
//! in the package's sentinel file.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::PackageError;
use crate::package::CHECKSUM_FILE;
use crate::walk::walk;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Digest the tree below `dir`, skipping entries whose file name is listed.
///
/// A skipped directory's children are still visited.
pub fn compute(dir: &Path, skip_names: &[&str]) -> Result<String, PackageError> {
    let mut hasher = Sha256::new();
    let mut hashed = 0usize;

    for entry in walk(dir)? {
        if skip_names.contains(&entry.name.as_str()) {
            continue;
        }
        if !entry.is_dir {
            let mut file = File::open(&entry.path).map_err(|e| PackageError::io(&entry.path, e))?;
            io::copy(&mut file, &mut hasher).map_err(|e| PackageError::io(&entry.path, e))?;
        }
        hasher.update(entry.relative.as_bytes());
        hashed += 1;
    }

    debug!(dir = %dir.display(), entries = hashed, "computed directory digest");
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of comparing a package against its sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    Match { digest: String },
    Mismatch { expected: String, actual: String },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Record the package digest in its sentinel file.
pub fn create(dir: &Path) -> Result<String, PackageError> {
    let digest = compute(dir, &[CHECKSUM_FILE])?;
    let sentinel = dir.join(CHECKSUM_FILE);
    fs::write(&sentinel, &digest).map_err(|e| PackageError::io(&sentinel, e))?;
    info!(path = %sentinel.display(), %digest, "checksum created");
    Ok(digest)
}

/// Recompute the digest and compare it with the sentinel.
pub fn verify(dir: &Path) -> Result<Verification, PackageError> {
    let sentinel = dir.join(CHECKSUM_FILE);
    let expected = fs::read_to_string(&sentinel).map_err(|e| PackageError::io(&sentinel, e))?;
    let actual = compute(dir, &[CHECKSUM_FILE])?;

    if actual == expected {
        info!(dir = %dir.display(), "checksum is correct");
        Ok(Verification::Match { digest: actual })
    } else {
        warn!(dir = %dir.display(), %expected, %actual, "checksum doesn't match");
        Ok(Verification::Mismatch { expected, actual })
    }
}
