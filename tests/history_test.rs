use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use confsync_core::{
    ConfigContent, NullRemote, OperationHistory, ResolutionStrategy, SyncConfig, SyncConflict,
    SyncEngine, SyncKind, SyncOperation, DEFAULT_HISTORY_LIMIT,
};

#[test]
fn test_history_evicts_oldest() {
    let mut history = OperationHistory::new(3);
    let operations: Vec<_> = (0..5).map(|_| SyncOperation::new(SyncKind::Pull)).collect();
    for operation in &operations {
        history.push(operation.clone());
    }

    assert_eq!(history.len(), 3);
    let snapshot = history.snapshot();
    assert_eq!(snapshot[0].id, operations[2].id);
    assert_eq!(snapshot[2].id, operations[4].id);
}

#[test]
fn test_mark_resolved_updates_conflict_record() {
    let mut history = OperationHistory::new(10);
    let path = PathBuf::from("app.json");

    let mut operation = SyncOperation::new(SyncKind::Merge);
    operation.conflicts.push(SyncConflict {
        path: path.clone(),
        local: Some(ConfigContent::Text("local".to_string())),
        remote: ConfigContent::Text("remote".to_string()),
        resolution: None,
        timestamp: Utc::now(),
    });
    let id = operation.id.clone();
    history.push(operation);

    history.mark_resolved(&id, &path, ResolutionStrategy::Local);

    let snapshot = history.snapshot();
    assert_eq!(
        snapshot[0].conflicts[0].resolution,
        Some(ResolutionStrategy::Local)
    );
}

#[tokio::test]
async fn test_engine_history_is_bounded() {
    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(
        SyncConfig::new(vec![dir.path().to_path_buf()]),
        Arc::new(NullRemote),
    );
    engine.load_state().await.unwrap();

    let mut ids = Vec::new();
    for _ in 0..150 {
        ids.push(engine.trigger_sync(SyncKind::Pull).await.unwrap().id);
    }

    let status = engine.status().await;
    assert_eq!(status.history.len(), DEFAULT_HISTORY_LIMIT);
    // Only the most recent operations survive
    assert_eq!(status.history[0].id, ids[50]);
    assert_eq!(status.history[DEFAULT_HISTORY_LIMIT - 1].id, ids[149]);
}

#[tokio::test]
async fn test_status_defaults_on_fresh_engine() {
    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(
        SyncConfig::new(vec![dir.path().to_path_buf()]),
        Arc::new(NullRemote),
    );
    engine.load_state().await.unwrap();

    let status = engine.status().await;
    assert!(!status.is_running);
    assert!(status.auto_sync_enabled);
    assert!(status.last_sync_time.is_none());
    assert!(status.next_sync_time.is_none());
    assert_eq!(status.pending_changes, 0);
    assert!(status.unresolved_conflicts.is_empty());
    assert!(status.history.is_empty());
}
