//! Value Resolver - YAML Loading and Override Merge
//!
//! Mappings deep-merge. Everything else (scalars, sequences, null) is
//! replaced wholesale by the override.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::PackageError;

/// Merged configuration data handed to every template.
pub type ValueMap = Map<String, Value>;

/// Parse a YAML values file.
///
/// An empty file, or one holding only comments or a null document, is an
/// empty map. Merge keys (`<<: *anchor`) are applied before conversion.
pub fn load_values(path: &Path) -> Result<ValueMap, PackageError> {
    let content = fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(ValueMap::new());
    }

    let parse_error = |source| PackageError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let mut document: serde_yaml::Value = serde_yaml::from_str(&content).map_err(parse_error)?;
    document.apply_merge().map_err(parse_error)?;
    let parsed: Value = serde_yaml::from_value(document).map_err(parse_error)?;

    match parsed {
        Value::Null => Ok(ValueMap::new()),
        Value::Object(map) => Ok(map),
        other => Err(PackageError::NotAMapping {
            path: path.to_path_buf(),
            found: kind_name(&other),
        }),
    }
}

/// Merge `override_values` on top of `base`. The override wins at every key.
pub fn merge(base: ValueMap, override_values: ValueMap) -> ValueMap {
    let mut merged = base;
    for (key, incoming) in override_values {
        match (merged.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                let current = std::mem::take(existing);
                *existing = merge(current, nested);
            }
            (_, incoming) => {
                merged.insert(key, incoming);
            }
        }
    }
    merged
}

/// Load the package defaults and, when given, merge a custom values file over
/// them.
///
/// Errors name which of the two files failed (`default` or `custom`).
pub fn resolve(defaults: &Path, custom: Option<&Path>) -> Result<ValueMap, PackageError> {
    let values = load_values(defaults).map_err(|e| e.in_values("default"))?;
    debug!(path = %defaults.display(), keys = values.len(), "loaded default values");

    let Some(custom) = custom else {
        return Ok(values);
    };

    let overrides = load_values(custom).map_err(|e| e.in_values("custom"))?;
    debug!(path = %custom.display(), keys = overrides.len(), "merging custom values");
    Ok(merge(values, overrides))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
