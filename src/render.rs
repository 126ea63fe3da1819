//! Renderer - Execute Compiled Units Against Values
//!
//! A fragment that is only whitespace is suppressed: it is not an error, it
//! just contributes nothing to the artifact.
//!
//! Missing values: a printed leaf whose parent mapping exists but lacks the
//! key renders as an empty string. A path that goes through an absent
//! intermediate (`{{ db.host.name }}` with no `db`) is still a render error.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::ast::{Expr, ExprVal, Node};
use tera::Context;
use tracing::debug;

use crate::checksum::sha256_hex;
use crate::error::PackageError;
use crate::templates::TemplateUnit;
use crate::values::ValueMap;

/// Text produced by one template unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub source: PathBuf,
    pub text: String,
}

impl RenderedFragment {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// SHA-256 of the fragment text, lowercase hex.
    pub fn digest(&self) -> String {
        sha256_hex(self.text.as_bytes())
    }

    /// True when the unit chose to emit nothing.
    pub fn is_suppressed(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Build the engine context once per render.
pub fn context(values: &ValueMap) -> Context {
    let mut ctx = Context::new();
    for (key, value) in values {
        ctx.insert(key.as_str(), value);
    }
    ctx
}

/// Run one unit against `values`.
pub fn execute(unit: &TemplateUnit, values: &ValueMap) -> Result<RenderedFragment, PackageError> {
    execute_in(unit, values, &context(values))
}

fn execute_in(unit: &TemplateUnit, values: &ValueMap, shared: &Context) -> Result<RenderedFragment, PackageError> {
    let absent = absent_leaves(unit, values);
    let filled;
    let ctx = if absent.is_empty() {
        shared
    } else {
        debug!(template = unit.name(), leaves = ?absent, "absent leaves render empty");
        filled = context(&fill_absent(values, &absent));
        &filled
    };

    let text = unit
        .engine()
        .render(unit.name(), ctx)
        .map_err(|e| PackageError::render(unit.path(), &e))?;

    let fragment = RenderedFragment::new(unit.path(), text);
    if fragment.is_suppressed() {
        debug!(template = unit.name(), "fragment suppressed");
    } else {
        debug!(
            template = unit.name(),
            digest = %fragment.digest(),
            "fragment rendered"
        );
    }
    Ok(fragment)
}

/// Run every unit in order, stopping at the first failure.
pub fn render_all(units: &[TemplateUnit], values: &ValueMap) -> Result<Vec<RenderedFragment>, PackageError> {
    let ctx = context(values);
    units.iter().map(|unit| execute_in(unit, values, &ctx)).collect()
}

/// Dotted paths printed by any template of `unit` whose parent resolves to a
/// mapping (or is the root) while the leaf key is missing.
///
/// Macro bodies are skipped: their names resolve against macro arguments.
/// Expressions starting with `default` keep the engine's own fallback.
fn absent_leaves(unit: &TemplateUnit, values: &ValueMap) -> Vec<Vec<String>> {
    let mut printed = Vec::new();
    for name in unit.engine().get_template_names() {
        if let Ok(template) = unit.engine().get_template(name) {
            collect_printed(&template.ast, &mut printed);
        }
    }

    let mut absent: Vec<Vec<String>> = Vec::new();
    for path in printed {
        let segments: Vec<String> = path.split('.').map(str::to_owned).collect();
        if segments.iter().any(|s| s.is_empty()) || absent.contains(&segments) {
            continue;
        }
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => continue,
        };
        if let Some(parent) = lookup(values, parents) {
            if !parent.contains_key(leaf) {
                absent.push(segments);
            }
        }
    }
    absent
}

fn collect_printed(nodes: &[Node], out: &mut Vec<String>) {
    let mut pending: Vec<&[Node]> = vec![nodes];
    while let Some(body) = pending.pop() {
        for node in body {
            match node {
                Node::VariableBlock(_, expr) => {
                    if let Some(path) = printed_ident(expr) {
                        out.push(path.to_owned());
                    }
                }
                Node::If(branches, _) => {
                    for (_, _, nodes) in &branches.conditions {
                        pending.push(nodes);
                    }
                    if let Some((_, nodes)) = &branches.otherwise {
                        pending.push(nodes);
                    }
                }
                Node::Forloop(_, forloop, _) => {
                    pending.push(&forloop.body);
                    if let Some(nodes) = &forloop.empty_body {
                        pending.push(nodes);
                    }
                }
                Node::Block(_, block, _) => pending.push(&block.body),
                Node::FilterSection(_, section, _) => pending.push(&section.body),
                _ => {}
            }
        }
    }
}

fn printed_ident(expr: &Expr) -> Option<&str> {
    match &expr.val {
        ExprVal::Ident(path) if !expr.has_default_filter() && !path.contains('[') => Some(path),
        _ => None,
    }
}

/// Mapping at `segments` below the root, if every step is a mapping.
fn lookup<'a>(values: &'a ValueMap, segments: &[String]) -> Option<&'a ValueMap> {
    let mut current = values;
    for segment in segments {
        match current.get(segment) {
            Some(Value::Object(map)) => current = map,
            _ => return None,
        }
    }
    Some(current)
}

fn fill_absent(values: &ValueMap, absent: &[Vec<String>]) -> ValueMap {
    let mut filled = values.clone();
    for segments in absent {
        insert_empty(&mut filled, segments);
    }
    filled
}

fn insert_empty(map: &mut ValueMap, segments: &[String]) {
    match segments {
        [leaf] => {
            map.insert(leaf.clone(), Value::String(String::new()));
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(nested)) = map.get_mut(head) {
                insert_empty(nested, rest);
            }
        }
        [] => {}
    }
}
