//! Contract Invariant Tests
//!
//! End-to-end guarantees of a package render and its checksum.

use std::fs;
use std::path::Path;

use composepack_core::{
    checksum::{self, compute},
    combine::{list_rendered, split_file_name},
    discover,
    package::{PackageLayout, CHECKSUM_FILE, TEMPLATES_DIR, VALUES_FILE},
    render_package, OutputMode, PackageError, RenderPipeline, RenderRequest, Verification,
};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small compose package with a shared helper, a nested template and an
/// optional service guarded by a flag.
fn create_test_package() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        VALUES_FILE,
        "project: shop\nweb:\n  image: nginx\n  tag: '1.25'\n  ports: [80, 443]\nredis:\n  enabled: false\n",
    );
    write(
        root,
        "templates/_labels.helper",
        "{% macro labels(name) %}labels:\n      app: {{ name }}{% endmacro labels %}",
    );
    write(
        root,
        "templates/10-web.yaml",
        "{% import \"_labels.helper\" as h %}services:\n  web:\n    image: {{ web.image }}:{{ web.tag }}\n    {{ h::labels(name=project) }}\n    ports:\n{% for p in web.ports %}      - \"{{ p }}\"\n{% endfor %}",
    );
    write(
        root,
        "templates/20-redis.yaml",
        "{% if redis.enabled %}services:\n  redis:\n    image: redis\n{% endif %}\n",
    );
    write(
        root,
        "templates/extra/volumes.yaml",
        "{% import \"_labels.helper\" as h %}volumes:\n  data: {}\n",
    );
    dir
}

fn render_to_string(package: &Path, custom: Option<&Path>) -> String {
    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("compose.yaml");
    RenderPipeline::new(PackageLayout::new(package))
        .render(&dest, custom, OutputMode::Combined)
        .unwrap();
    fs::read_to_string(dest).unwrap()
}

#[test]
fn invariant_render_is_reproducible() {
    let pkg = create_test_package();
    let first = render_to_string(pkg.path(), None);
    let second = render_to_string(pkg.path(), None);
    assert_eq!(first, second);
}

#[test]
fn invariant_combined_artifact_shape() {
    let pkg = create_test_package();
    let artifact = render_to_string(pkg.path(), None);

    // Walk order: 10-web.yaml, 20-redis.yaml (suppressed), extra/volumes.yaml
    let documents: Vec<_> = artifact.split("\n---\n").collect();
    assert_eq!(documents.len(), 2);
    assert!(documents[0].starts_with("services:\n  web:\n    image: nginx:1.25"));
    assert!(documents[0].contains("app: shop"));
    assert!(documents[0].contains("- \"443\""));
    assert_eq!(documents[1], "volumes:\n  data: {}\n");
    assert!(!artifact.starts_with("---"));
    assert!(!artifact.ends_with("---\n"));
}

#[test]
fn invariant_custom_values_enable_guarded_fragment() {
    let pkg = create_test_package();
    let custom = pkg.path().join("prod.yaml");
    fs::write(&custom, "redis:\n  enabled: true\nweb:\n  ports: [8080]\n").unwrap();

    let artifact = render_to_string(pkg.path(), Some(&custom));
    let documents: Vec<_> = artifact.split("\n---\n").collect();
    assert_eq!(documents.len(), 3);
    assert!(documents[1].contains("image: redis"));
    // Sequences are replaced, mappings deep-merged.
    assert!(documents[0].contains("- \"8080\""));
    assert!(!documents[0].contains("- \"80\"\n"));
    assert!(documents[0].contains("image: nginx:1.25"));
}

#[test]
fn invariant_split_mode_reuses_fragments() {
    let pkg = create_test_package();
    let combined = render_to_string(pkg.path(), None);

    let out = tempfile::tempdir().unwrap();
    let outcome = render_package(&RenderRequest {
        package: pkg.path().to_path_buf(),
        destination: out.path().to_path_buf(),
        custom_values: None,
        mode: OutputMode::Split,
    })
    .unwrap();

    assert_eq!(outcome.emitted, 2);
    assert_eq!(outcome.suppressed, 1);
    let files = list_rendered(out.path()).unwrap();
    assert_eq!(files, vec![out.path().join(split_file_name(1)), out.path().join(split_file_name(2))]);

    let joined: Vec<_> = files.iter().map(|f| fs::read_to_string(f).unwrap()).collect();
    assert_eq!(joined.join("\n---\n"), combined);
}

#[test]
fn invariant_invalid_values_produce_no_output() {
    let pkg = create_test_package();
    fs::write(pkg.path().join(VALUES_FILE), "name: Test\nage: 30:").unwrap();

    let out = tempfile::tempdir().unwrap();
    let err = render_package(&RenderRequest {
        package: pkg.path().to_path_buf(),
        destination: out.path().to_path_buf(),
        custom_values: None,
        mode: OutputMode::Split,
    })
    .unwrap_err();

    assert_eq!(err.stage(), "parse");
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn invariant_bad_helper_blocks_every_template() {
    let pkg = create_test_package();
    write(pkg.path(), "templates/extra/broken.helper", "{% macro oops() %}");

    let out = tempfile::tempdir().unwrap();
    let dest = out.path().join("compose.yaml");
    let err = RenderPipeline::new(PackageLayout::new(pkg.path()))
        .render(&dest, None, OutputMode::Combined)
        .unwrap_err();

    assert!(matches!(err, PackageError::Compile { .. }));
    assert!(err.to_string().contains("broken.helper"));
    assert!(!dest.exists());
}

#[test]
fn invariant_empty_values_file_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), VALUES_FILE, "");
    write(dir.path(), "templates/static.yaml", "version: '3'\n");

    assert_eq!(render_to_string(dir.path(), None), "version: '3'\n");
}

#[test]
fn invariant_absent_leaf_renders_empty() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), VALUES_FILE, "base: &b\n  image: nginx\nweb:\n  <<: *b\n");
    write(
        dir.path(),
        "templates/web.yaml",
        "image: {{ web.image }}\nname: {{ missing }}\nport: {{ web.port }}\n",
    );

    assert_eq!(render_to_string(dir.path(), None), "image: nginx\nname: \nport: \n");
}

#[test]
fn invariant_discovery_order_stable() {
    let pkg = create_test_package();
    let templates = pkg.path().join(TEMPLATES_DIR);
    assert_eq!(discover(&templates).unwrap(), discover(&templates).unwrap());
}

#[test]
fn invariant_checksum_roundtrip() {
    let pkg = create_test_package();
    let digest = checksum::create(pkg.path()).unwrap();

    assert_eq!(compute(pkg.path(), &[CHECKSUM_FILE]).unwrap(), digest);
    assert_eq!(
        checksum::verify(pkg.path()).unwrap(),
        Verification::Match { digest }
    );
}

#[test]
fn invariant_checksum_detects_tampering() {
    let pkg = create_test_package();
    checksum::create(pkg.path()).unwrap();
    write(pkg.path(), "templates/extra/new.yaml", "new: 1\n");

    let outcome = checksum::verify(pkg.path()).unwrap();
    assert!(!outcome.is_match());
}

#[test]
fn invariant_render_does_not_disturb_checksum() {
    let pkg = create_test_package();
    checksum::create(pkg.path()).unwrap();
    let _ = render_to_string(pkg.path(), None);
    assert!(checksum::verify(pkg.path()).unwrap().is_match());
}
