//! Template Set - Discovery and Compilation
//!
//! Every file below the templates root is either a helper (reserved
//! `.helper` suffix) or a template. Helpers are package-global: each template
//! is compiled together with all of them, wherever they live in the tree.

use std::fs;
use std::path::{Path, PathBuf};

use tera::Tera;
use tracing::debug;

use crate::error::PackageError;
use crate::package::HELPER_SUFFIX;
use crate::walk::walk;

/// A discovered template or helper file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: PathBuf,
    /// Name the engine knows the file by: its path relative to the templates
    /// root, `/` separated.
    pub name: String,
}

impl TemplateFile {
    pub fn is_helper(&self) -> bool {
        self.name.ends_with(HELPER_SUFFIX)
    }
}

/// Result of walking a templates root. Both lists are in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub templates: Vec<TemplateFile>,
    pub helpers: Vec<TemplateFile>,
}

/// Recursively classify every file below `root`.
pub fn discover(root: &Path) -> Result<Discovery, PackageError> {
    let mut discovery = Discovery::default();

    for entry in walk(root)? {
        if entry.is_dir {
            continue;
        }
        let file = TemplateFile {
            path: entry.path,
            name: entry.relative,
        };
        if file.is_helper() {
            discovery.helpers.push(file);
        } else {
            discovery.templates.push(file);
        }
    }

    debug!(
        root = %root.display(),
        templates = discovery.templates.len(),
        helpers = discovery.helpers.len(),
        "discovered template files"
    );
    Ok(discovery)
}

/// One template compiled together with every package helper.
#[derive(Debug)]
pub struct TemplateUnit {
    path: PathBuf,
    name: String,
    engine: Tera,
}

impl TemplateUnit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn engine(&self) -> &Tera {
        &self.engine
    }
}

/// Compile `template` with all `helpers` visible to it.
///
/// A syntax error in any helper fails every template of the package.
pub fn compile(template: &TemplateFile, helpers: &[TemplateFile]) -> Result<TemplateUnit, PackageError> {
    let mut sources = Vec::with_capacity(helpers.len() + 1);
    for helper in helpers {
        sources.push((helper.name.clone(), read_source(&helper.path)?));
    }
    sources.push((template.name.clone(), read_source(&template.path)?));

    let mut engine = Tera::default();
    // Output is configuration, never HTML.
    engine.autoescape_on(vec![]);
    engine
        .add_raw_templates(sources)
        .map_err(|e| PackageError::compile(&template.path, &e))?;

    Ok(TemplateUnit {
        path: template.path.clone(),
        name: template.name.clone(),
        engine,
    })
}

/// Compile every discovered template, in discovery order.
pub fn compile_all(discovery: &Discovery) -> Result<Vec<TemplateUnit>, PackageError> {
    discovery
        .templates
        .iter()
        .map(|template| compile(template, &discovery.helpers))
        .collect()
}

fn read_source(path: &Path) -> Result<String, PackageError> {
    fs::read_to_string(path).map_err(|e| PackageError::io(path, e))
}

/// Compiled templates of one package, in discovery order.
#[derive(Debug, Default)]
pub struct TemplateSet {
    units: Vec<TemplateUnit>,
}

impl TemplateSet {
    /// Discover and compile everything below `root`.
    pub fn load(root: &Path) -> Result<Self, PackageError> {
        let discovery = discover(root)?;
        Ok(Self {
            units: compile_all(&discovery)?,
        })
    }

    pub fn units(&self) -> &[TemplateUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
