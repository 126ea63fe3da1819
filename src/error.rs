//! Error taxonomy shared by every stage of the package engine.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Values in {path} must be a mapping at the top level, found {found}")]
    NotAMapping { path: PathBuf, found: &'static str },

    #[error("Compile error in {path}: {detail}")]
    Compile { path: PathBuf, detail: String },

    #[error("Render error in {path}: {detail}")]
    Render { path: PathBuf, detail: String },

    /// A values file failed to load; `role` is `default` or `custom`.
    #[error("Failed to load {role} values: {source}")]
    Values {
        role: &'static str,
        #[source]
        source: Box<PackageError>,
    },
}

impl PackageError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn compile(path: impl AsRef<Path>, err: &tera::Error) -> Self {
        Self::Compile {
            path: path.as_ref().to_path_buf(),
            detail: error_chain(err),
        }
    }

    pub(crate) fn render(path: impl AsRef<Path>, err: &tera::Error) -> Self {
        Self::Render {
            path: path.as_ref().to_path_buf(),
            detail: error_chain(err),
        }
    }

    pub(crate) fn in_values(self, role: &'static str) -> Self {
        Self::Values {
            role,
            source: Box::new(self),
        }
    }

    /// Pipeline stage the error came from, as reported by the CLI bridge.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Values { source, .. } => source.stage(),
            Self::Io { .. } => "io",
            Self::Parse { .. } | Self::NotAMapping { .. } => "parse",
            Self::Compile { .. } => "compile",
            Self::Render { .. } => "render",
        }
    }

    /// Path of the file or directory the error is about.
    pub fn path(&self) -> &Path {
        match self {
            Self::Values { source, .. } => source.path(),
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::NotAMapping { path, .. }
            | Self::Compile { path, .. }
            | Self::Render { path, .. } => path,
        }
    }
}

/// Tera keeps the useful part (line, column, offending helper) in the source
/// chain, so flatten it into one line.
fn error_chain(err: &tera::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}
