use std::fs;
use std::path::Path;

use proptest::prelude::*;
use tempfile::TempDir;

use confsync_core::{ChangeKind, ConfigContent, StateStore, WriteOptions};

#[tokio::test]
async fn test_load_state_skips_missing_root() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.json"), r#"{"x":1}"#).unwrap();

    let mut store = StateStore::new(vec![
        dir.path().to_path_buf(),
        dir.path().join("does-not-exist"),
    ]);
    store.load().await.unwrap();

    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_load_state_excludes_unparseable_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("good.json"), r#"{"x":1}"#).unwrap();
    fs::write(dir.path().join("bad.json"), "{not json").unwrap();
    fs::write(dir.path().join("note.txt"), "anything goes here").unwrap();

    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    assert_eq!(store.len(), 2);
    assert!(store.entry(&dir.path().join("bad.json")).is_none());
    assert!(store.entry(&dir.path().join("good.json")).is_some());
}

#[tokio::test]
async fn test_detect_create() {
    let dir = TempDir::new().unwrap();
    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    let path = dir.path().join("a.json");
    fs::write(&path, r#"{"x":1}"#).unwrap();

    let changes = store.detect_changes().await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Create);
    assert_eq!(changes[0].path, path);
    assert!(changes[0].before.is_none());

    let expected = ConfigContent::parse(&path, r#"{"x":1}"#).unwrap();
    assert_eq!(changes[0].after.as_ref().unwrap(), &expected);

    // A second pass with no intervening writes reports nothing
    assert!(store.detect_changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_detect_noop_for_touched_but_unchanged_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("b.yaml");
    fs::write(&path, "k: 1\n").unwrap();

    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    // Rewrite identical content; only the mtime moves
    fs::write(&path, "k: 1\n").unwrap();

    assert!(store.detect_changes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_detect_update_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.json");
    fs::write(&path, r#"{"x":1}"#).unwrap();

    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    fs::write(&path, r#"{"x":2}"#).unwrap();

    let changes = store.detect_changes().await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Update);
    assert!(changes[0].before.is_some());

    let expected = ConfigContent::parse(&path, r#"{"x":2}"#).unwrap();
    assert_eq!(store.entry(&path).unwrap().hash, expected.digest().unwrap());
}

#[tokio::test]
async fn test_detect_delete() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.txt");
    fs::write(&path, "plain text\n").unwrap();

    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    fs::remove_file(&path).unwrap();

    let changes = store.detect_changes().await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Delete);
    assert_eq!(
        changes[0].before.as_ref().unwrap(),
        &ConfigContent::Text("plain text\n".to_string())
    );
    assert!(changes[0].after.is_none());
    assert!(store.entry(&path).is_none());
}

#[tokio::test]
async fn test_detect_changes_sorted_by_path() {
    let dir = TempDir::new().unwrap();
    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    fs::write(dir.path().join("z.json"), r#"{"z":1}"#).unwrap();
    fs::write(dir.path().join("a.json"), r#"{"a":1}"#).unwrap();
    fs::write(dir.path().join("m.txt"), "middle").unwrap();

    let changes = store.detect_changes().await.unwrap();
    assert_eq!(changes.len(), 3);
    let paths: Vec<_> = changes.iter().map(|c| c.path.clone()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[tokio::test]
async fn test_backup_written_before_overwrite() {
    let dir = TempDir::new().unwrap();
    let backup = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    fs::write(&path, r#"{"x":1}"#).unwrap();

    let mut store = StateStore::new(vec![dir.path().to_path_buf()]);
    store.load().await.unwrap();

    let options = WriteOptions {
        max_retries: 0,
        backup_path: Some(backup.path().to_path_buf()),
    };
    let content = ConfigContent::parse(&path, r#"{"x":2}"#).unwrap();
    store.write_content(&path, &content, &options).await.unwrap();

    let backups: Vec<_> = fs::read_dir(backup.path()).unwrap().collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(store.entry(&path).unwrap().hash, content.digest().unwrap());
}

proptest! {
    #[test]
    fn digest_ignores_key_order(a in 0i64..1000, b in 0i64..1000) {
        let left = ConfigContent::parse(
            Path::new("left.json"),
            &format!(r#"{{"alpha":{a},"beta":{b}}}"#),
        )
        .unwrap();
        let right = ConfigContent::parse(
            Path::new("right.json"),
            &format!(r#"{{"beta":{b},"alpha":{a}}}"#),
        )
        .unwrap();
        prop_assert_eq!(left.digest().unwrap(), right.digest().unwrap());
    }
}
