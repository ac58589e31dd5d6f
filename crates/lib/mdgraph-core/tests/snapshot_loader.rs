use std::fs;
use std::path::{Path, PathBuf};

use mdgraph_core::snapshot::{SnapshotError, load_snapshot, load_snapshot_async, read_snapshot_file};
use mdgraph_store::models::Meta;
use tempfile::TempDir;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("snapshot")
}

fn write_snapshot(dir: &Path, meta: &str, objects: &str, relations: &str) {
    fs::write(dir.join("meta.json"), meta).expect("write meta");
    fs::write(dir.join("objects.json"), objects).expect("write objects");
    fs::write(dir.join("relations.json"), relations).expect("write relations");
}

#[test]
fn loads_fixture_snapshot() {
    let snapshot = load_snapshot(fixture_dir()).expect("fixture should load");
    assert_eq!(snapshot.meta.config_name, "TradeManagement");
    assert_eq!(snapshot.meta.object_count, 4);
    assert_eq!(snapshot.objects.len(), 4);
    assert_eq!(snapshot.relations.len(), 4);

    let invoice = &snapshot.objects[0];
    assert_eq!(invoice.id, "doc.SalesInvoice");
    assert_eq!(invoice.props.len(), 2);
    assert_eq!(invoice.tabular_sections[0].name, "Goods");
}

#[test]
fn missing_fields_take_defaults() {
    let dir = TempDir::new().expect("tempdir");
    write_snapshot(
        dir.path(),
        r#"{"configName":"Tiny"}"#,
        r#"[{"id":"cat.A"}]"#,
        "[]",
    );
    let snapshot = load_snapshot(dir.path()).expect("snapshot should load");
    assert_eq!(snapshot.meta.config_name, "Tiny");
    assert_eq!(snapshot.meta.object_count, 0);
    assert!(snapshot.objects[0].props.is_empty());
    assert!(snapshot.objects[0].name.is_empty());
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("meta.json"), "{}").expect("write meta");
    fs::write(dir.path().join("objects.json"), "[]").expect("write objects");

    let err = load_snapshot(dir.path()).expect_err("relations.json is missing");
    match err {
        SnapshotError::NotFound { path } => assert!(path.ends_with("relations.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_directory_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let err = load_snapshot(dir.path().join("absent")).expect_err("directory is missing");
    assert!(matches!(err, SnapshotError::NotFound { .. }));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    write_snapshot(dir.path(), "{}", "[{\"id\": ", "[]");
    let err = load_snapshot(dir.path()).expect_err("objects.json is malformed");
    match err {
        SnapshotError::Parse { path, .. } => assert!(path.ends_with("objects.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wrong_shape_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    write_snapshot(dir.path(), "[]", "[]", "[]");
    let err = load_snapshot(dir.path()).expect_err("meta.json must be an object");
    assert!(matches!(err, SnapshotError::Parse { .. }));
}

#[test]
fn positional_meta_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    write_snapshot(dir.path(), r#"["9.9","Hijacked","1.0"]"#, "[]", "[]");
    let err = load_snapshot(dir.path()).expect_err("positional meta is rejected");
    match err {
        SnapshotError::Parse { path, .. } => assert!(path.ends_with("meta.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn positional_entries_are_parse_errors() {
    let dir = TempDir::new().expect("tempdir");
    write_snapshot(dir.path(), "{}", r#"[["doc.A","document","A"]]"#, "[]");
    let err = load_snapshot(dir.path()).expect_err("positional object is rejected");
    match err {
        SnapshotError::Parse { path, .. } => assert!(path.ends_with("objects.json")),
        other => panic!("unexpected error: {other}"),
    }

    write_snapshot(
        dir.path(),
        "{}",
        r#"[{"id":"doc.A"}]"#,
        r#"[["doc.A","doc.A","uses"]]"#,
    );
    let err = load_snapshot(dir.path()).expect_err("positional relation is rejected");
    match err {
        SnapshotError::Parse { path, .. } => assert!(path.ends_with("relations.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn relative_file_name_cannot_leave_root() {
    let outer = TempDir::new().expect("tempdir");
    let root = outer.path().join("snapshot");
    fs::create_dir(&root).expect("create root");
    fs::write(outer.path().join("secret.json"), "{}").expect("write outside file");

    let err = read_snapshot_file::<Meta>(&root, "../secret.json")
        .expect_err("file outside root should be rejected");
    assert!(matches!(err, SnapshotError::PathEscape { .. }));
}

#[cfg(unix)]
#[test]
fn symlink_outside_root_is_rejected() {
    let outer = TempDir::new().expect("tempdir");
    let root = outer.path().join("snapshot");
    fs::create_dir(&root).expect("create root");
    fs::write(root.join("meta.json"), "{}").expect("write meta");
    fs::write(root.join("relations.json"), "[]").expect("write relations");
    let elsewhere = outer.path().join("objects.json");
    fs::write(&elsewhere, "[]").expect("write outside file");
    std::os::unix::fs::symlink(&elsewhere, root.join("objects.json")).expect("symlink");

    let err = load_snapshot(&root).expect_err("symlink escape should be rejected");
    assert!(matches!(err, SnapshotError::PathEscape { .. }));
}

#[cfg(unix)]
#[test]
fn symlink_inside_root_is_allowed() {
    let root = TempDir::new().expect("tempdir");
    write_snapshot(root.path(), "{}", "[]", "[]");
    fs::create_dir(root.path().join("data")).expect("create data dir");
    fs::rename(
        root.path().join("objects.json"),
        root.path().join("data").join("objects.json"),
    )
    .expect("move objects");
    std::os::unix::fs::symlink(
        root.path().join("data").join("objects.json"),
        root.path().join("objects.json"),
    )
    .expect("symlink");

    let snapshot = load_snapshot(root.path()).expect("symlink inside root is fine");
    assert!(snapshot.objects.is_empty());
}

#[tokio::test]
async fn async_loader_matches_sync_loader() {
    let sync = load_snapshot(fixture_dir()).expect("fixture should load");
    let loaded = load_snapshot_async(fixture_dir())
        .await
        .expect("fixture should load asynchronously");
    assert_eq!(loaded, sync);
}
