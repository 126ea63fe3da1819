//! Render Pipeline - Single Entry Point
//!
//! values -> templates -> fragments -> artifact. Every unit is rendered in
//! memory before anything touches the destination, and output is staged then
//! renamed into place so a failed run never leaves a half-written artifact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info};

use crate::combine::{combine, prune_rendered, write_split};
use crate::error::PackageError;
use crate::package::PackageLayout;
use crate::render::{render_all, RenderedFragment};
use crate::templates::TemplateSet;
use crate::values::resolve;

const STAGING_PREFIX: &str = ".composepack-staging";

/// How rendered fragments are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One file, fragments separated by `---`.
    #[default]
    Combined,
    /// One numbered file per fragment inside a directory.
    Split,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub package: PathBuf,
    /// Output file (combined) or directory (split).
    pub destination: PathBuf,
    #[serde(default)]
    pub custom_values: Option<PathBuf>,
    #[serde(default)]
    pub mode: OutputMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutcome {
    pub emitted: usize,
    pub suppressed: usize,
    pub outputs: Vec<PathBuf>,
}

/// The render pipeline for one package directory.
pub struct RenderPipeline {
    layout: PackageLayout,
}

impl RenderPipeline {
    pub fn new(layout: PackageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    /// Resolve values, compile every template and render all fragments, in
    /// discovery order. Nothing is written.
    pub fn render_fragments(&self, custom_values: Option<&Path>) -> Result<Vec<RenderedFragment>, PackageError> {
        let values = resolve(&self.layout.values_file(), custom_values)?;
        let templates = TemplateSet::load(&self.layout.templates_dir())?;
        debug!(units = templates.len(), "compiled templates");
        render_all(templates.units(), &values)
    }

    /// Render and persist to `destination` using `mode`.
    pub fn render(
        &self,
        destination: &Path,
        custom_values: Option<&Path>,
        mode: OutputMode,
    ) -> Result<RenderOutcome, PackageError> {
        let fragments = self.render_fragments(custom_values)?;
        let suppressed = fragments.iter().filter(|f| f.is_suppressed()).count();
        let emitted = fragments.len() - suppressed;

        let outputs = match mode {
            OutputMode::Combined => vec![persist_combined(&fragments, destination)?],
            OutputMode::Split => persist_split(&fragments, destination)?,
        };

        info!(
            package = %self.layout.root().display(),
            destination = %destination.display(),
            emitted,
            suppressed,
            "rendered package"
        );
        Ok(RenderOutcome {
            emitted,
            suppressed,
            outputs,
        })
    }
}

/// Render a package as described by `request`.
pub fn render_package(request: &RenderRequest) -> Result<RenderOutcome, PackageError> {
    RenderPipeline::new(PackageLayout::new(&request.package)).render(
        &request.destination,
        request.custom_values.as_deref(),
        request.mode,
    )
}

fn persist_combined(fragments: &[RenderedFragment], destination: &Path) -> Result<PathBuf, PackageError> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(parent).map_err(|e| PackageError::io(parent, e))?;
    std::io::Write::write_all(&mut staged, combine(fragments).as_bytes())
        .map_err(|e| PackageError::io(staged.path(), e))?;
    // Temp files are created 0600; the artifact keeps the mode of the file it
    // replaces, or gets a regular 0644.
    if let Some(permissions) = artifact_permissions(destination) {
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(|e| PackageError::io(staged.path(), e))?;
    }
    staged
        .persist(destination)
        .map_err(|e| PackageError::io(destination, e.error))?;

    Ok(destination.to_path_buf())
}

fn artifact_permissions(destination: &Path) -> Option<fs::Permissions> {
    if let Ok(meta) = fs::metadata(destination) {
        return Some(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// New files are renamed over the old ones first; only then are split files
/// from a previous, longer render removed.
fn persist_split(fragments: &[RenderedFragment], destination: &Path) -> Result<Vec<PathBuf>, PackageError> {
    fs::create_dir_all(destination).map_err(|e| PackageError::io(destination, e))?;

    // Dropped on every exit path, removing whatever is left inside.
    let staging = Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(destination)
        .map_err(|e| PackageError::io(destination, e))?;

    let staged = write_split(fragments, staging.path())?;
    let mut outputs = Vec::with_capacity(staged.len());
    for path in staged {
        let Some(name) = path.file_name() else { continue };
        let target = destination.join(name);
        fs::rename(&path, &target).map_err(|e| PackageError::io(&target, e))?;
        outputs.push(target);
    }

    prune_rendered(destination, &outputs)?;
    Ok(outputs)
}
