//! Package Layout - Directory Contract
//!
//! Rules produce structured issues; the report collects all of them so a
//! caller can show every missing entry at once.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default values file at the package root.
pub const VALUES_FILE: &str = "values.yaml";
/// Discovery root for templates and helpers.
pub const TEMPLATES_DIR: &str = "templates";
/// Integrity sentinel at the package root.
pub const CHECKSUM_FILE: &str = "CHECKSUM";
/// Files ending with this suffix are helpers, not templates.
pub const HELPER_SUFFIX: &str = ".helper";
/// Split-mode output files are `<prefix><n><suffix>`.
pub const SPLIT_PREFIX: &str = "docker-compose-rendered-";
pub const SPLIT_SUFFIX: &str = ".yaml";
/// Pattern matched by every split-mode output file.
pub const SPLIT_PATTERN: &str = r"^docker-compose-rendered-\d+\.yaml$";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutIssue {
    pub rule: String,
    pub severity: IssueSeverity,
    pub message: String,
    pub path: PathBuf,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutReport {
    pub valid: bool,
    pub issues: Vec<LayoutIssue>,
}

impl LayoutReport {
    pub fn errors(&self) -> impl Iterator<Item = &LayoutIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
    }
}

/// Well-known paths of one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn values_file(&self) -> PathBuf {
        self.root.join(VALUES_FILE)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn checksum_file(&self) -> PathBuf {
        self.root.join(CHECKSUM_FILE)
    }

    /// Run every layout rule and collect all issues.
    pub fn check(&self) -> LayoutReport {
        let rules: [&dyn LayoutRule; 4] = [
            &RootExists,
            &RequiredEntry { name: VALUES_FILE, dir: false },
            &RequiredEntry { name: TEMPLATES_DIR, dir: true },
            &SentinelPresent,
        ];

        let issues: Vec<_> = rules.iter().flat_map(|rule| rule.check(self)).collect();
        let valid = !issues.iter().any(|i| i.severity == IssueSeverity::Error);
        LayoutReport { valid, issues }
    }
}

trait LayoutRule {
    fn name(&self) -> &'static str;
    fn check(&self, layout: &PackageLayout) -> Vec<LayoutIssue>;
}

struct RootExists;

impl LayoutRule for RootExists {
    fn name(&self) -> &'static str { "package_root" }

    fn check(&self, layout: &PackageLayout) -> Vec<LayoutIssue> {
        if layout.root.is_dir() {
            return vec![];
        }
        vec![LayoutIssue {
            rule: self.name().to_string(),
            severity: IssueSeverity::Error,
            message: format!("directory doesn't exist: {}", layout.root.display()),
            path: layout.root.clone(),
            remediation: vec!["Point at an existing package directory".to_string()],
        }]
    }
}

struct RequiredEntry {
    name: &'static str,
    dir: bool,
}

impl LayoutRule for RequiredEntry {
    fn name(&self) -> &'static str { "required_entry" }

    fn check(&self, layout: &PackageLayout) -> Vec<LayoutIssue> {
        let path = layout.root.join(self.name);
        let present = if self.dir { path.is_dir() } else { path.is_file() };
        if present {
            return vec![];
        }

        let kind = if self.dir { "directory" } else { "file" };
        vec![LayoutIssue {
            rule: self.name().to_string(),
            severity: IssueSeverity::Error,
            message: format!(
                "can't find {} {} inside directory: {}",
                self.name,
                kind,
                layout.root.display()
            ),
            path,
            remediation: vec![format!("Create {} in the package root", self.name)],
        }]
    }
}

struct SentinelPresent;

impl LayoutRule for SentinelPresent {
    fn name(&self) -> &'static str { "checksum_sentinel" }

    fn check(&self, layout: &PackageLayout) -> Vec<LayoutIssue> {
        if !layout.root.is_dir() || layout.checksum_file().is_file() {
            return vec![];
        }
        vec![LayoutIssue {
            rule: self.name().to_string(),
            severity: IssueSeverity::Info,
            message: "package has no checksum sentinel".to_string(),
            path: layout.checksum_file(),
            remediation: vec!["Run `checksum create` to record one".to_string()],
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_complete_package_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VALUES_FILE), "").unwrap();
        fs::create_dir(dir.path().join(TEMPLATES_DIR)).unwrap();
        fs::write(dir.path().join(CHECKSUM_FILE), "abc").unwrap();

        let report = PackageLayout::new(dir.path()).check();
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_reports_every_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let report = PackageLayout::new(dir.path()).check();

        assert!(!report.valid);
        let messages: Vec<_> = report.errors().map(|i| i.message.clone()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("values.yaml"));
        assert!(messages[1].contains("templates"));
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Info && i.rule == "checksum_sentinel"));
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let report = PackageLayout::new(dir.path().join("absent")).check();
        assert!(!report.valid);
        assert_eq!(report.issues[0].rule, "package_root");
    }

    #[test]
    fn test_values_must_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(VALUES_FILE)).unwrap();
        fs::create_dir(dir.path().join(TEMPLATES_DIR)).unwrap();

        let report = PackageLayout::new(dir.path()).check();
        assert!(!report.valid);
        assert_eq!(report.errors().count(), 1);
    }
}
