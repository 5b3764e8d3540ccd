use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::sleep;

use confsync_core::{NullRemote, OperationStatus, SyncConfig, SyncEngine};
use confsync_daemon::SyncScheduler;

fn scheduled_engine(dir: &Path, interval_ms: u64, auto_sync: bool) -> Arc<SyncEngine> {
    let mut config = SyncConfig::new(vec![dir.to_path_buf()]);
    config.sync_interval_ms = interval_ms;
    config.auto_sync = auto_sync;
    config.max_retries = 0;
    Arc::new(SyncEngine::new(config, Arc::new(NullRemote)))
}

#[tokio::test]
async fn test_scheduler_pulls_periodically() {
    let dir = TempDir::new().unwrap();
    let engine = scheduled_engine(dir.path(), 50, true);
    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    scheduler.start().await.unwrap();

    fs::write(dir.path().join("app.json"), r#"{"x":1}"#).unwrap();
    sleep(Duration::from_millis(300)).await;

    let status = engine.status().await;
    assert!(!status.history.is_empty());
    assert_eq!(status.pending_changes, 0);
    assert!(status.next_sync_time.is_some());
    assert!(status.last_sync_time.is_some());

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn test_disable_auto_sync_cancels_pending_timer() {
    let dir = TempDir::new().unwrap();
    let engine = scheduled_engine(dir.path(), 50, true);
    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    scheduler.start().await.unwrap();

    scheduler.disable_auto_sync().await;
    // Let any pull that was already in flight drain
    sleep(Duration::from_millis(150)).await;
    let before = engine.status().await.history.len();

    fs::write(dir.path().join("app.json"), r#"{"x":1}"#).unwrap();
    sleep(Duration::from_millis(250)).await;

    let paused = engine.status().await;
    assert_eq!(paused.history.len(), before);
    assert!(!paused.auto_sync_enabled);
    assert!(paused.next_sync_time.is_none());

    scheduler.enable_auto_sync().await;
    sleep(Duration::from_millis(250)).await;

    let resumed = engine.status().await;
    assert!(resumed.history.len() > before);
    assert_eq!(resumed.pending_changes, 0);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn test_auto_sync_disabled_at_start_never_fires() {
    let dir = TempDir::new().unwrap();
    let engine = scheduled_engine(dir.path(), 50, false);
    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    scheduler.start().await.unwrap();

    fs::write(dir.path().join("app.json"), r#"{"x":1}"#).unwrap();
    sleep(Duration::from_millis(200)).await;

    let status = engine.status().await;
    assert!(status.history.is_empty());
    assert!(!status.auto_sync_enabled);
    assert!(status.next_sync_time.is_none());

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn test_scheduler_survives_failed_pull() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.json");
    fs::write(&path, r#"{"x":1}"#).unwrap();

    let engine = scheduled_engine(dir.path(), 50, true);
    let scheduler =
        SyncScheduler::new(Arc::clone(&engine)).with_stop_timeout(Duration::from_secs(1));
    scheduler.start().await.unwrap();

    // A directory at the recorded path makes every applied delete fail
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    sleep(Duration::from_millis(300)).await;

    let status = engine.status().await;
    let failed: Vec<_> = status
        .history
        .iter()
        .filter(|op| op.status == OperationStatus::Failed)
        .collect();
    assert!(!failed.is_empty());
    assert!(!failed[0].error.as_deref().unwrap_or("").is_empty());
    // The loop kept rescheduling after the failure
    assert!(status.history.len() >= 2);

    scheduler.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_clears_engine_state() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.json"), r#"{"x":1}"#).unwrap();

    let engine = scheduled_engine(dir.path(), 60_000, true);
    let scheduler = SyncScheduler::new(Arc::clone(&engine));
    scheduler.start().await.unwrap();
    assert!(scheduler.is_running().await);

    scheduler.stop().await.unwrap();
    assert!(!scheduler.is_running().await);

    // The snapshot was dropped, so the file on disk reads as fresh drift
    let status = engine.status().await;
    assert_eq!(status.pending_changes, 1);
    assert!(status.next_sync_time.is_none());
}

#[tokio::test]
async fn test_stop_without_start_fails() {
    let dir = TempDir::new().unwrap();
    let engine = scheduled_engine(dir.path(), 50, true);
    let scheduler = SyncScheduler::new(engine);

    assert!(scheduler.stop().await.is_err());
}

#[tokio::test]
async fn test_abort_in_flight_is_a_noop_when_idle() {
    let dir = TempDir::new().unwrap();
    let engine = scheduled_engine(dir.path(), 50, true);
    engine.load_state().await.unwrap();

    assert_eq!(engine.abort_in_flight("interrupted by shutdown").await, 0);
}
