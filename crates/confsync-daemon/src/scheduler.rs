//! Auto-sync scheduling for the confsync engine.
//!
//! The scheduler owns the periodic pull loop and the cooperative shutdown
//! path around a shared [`SyncEngine`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use confsync_core::{OperationStatus, SyncEngine, SyncKind};

use crate::error::{DaemonError, DaemonResult};

/// Bound on how long `stop` waits for in-flight operations
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Scheduler driving periodic pulls against a shared engine
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    interval: Duration,
    stop_timeout: Duration,
    auto_sync_tx: watch::Sender<bool>,
    shutdown_tx: Mutex<Option<broadcast::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    /// Create a scheduler over an engine, taking the interval and the
    /// auto-sync default from the engine's configuration
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let interval = engine.config().sync_interval();
        let auto_sync = engine.config().auto_sync;
        let (auto_sync_tx, _) = watch::channel(auto_sync);

        Self {
            engine,
            interval,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            auto_sync_tx,
            shutdown_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Override the shutdown wait bound
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Whether the pull loop is currently spawned
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Load initial state and spawn the auto-sync loop
    pub async fn start(&self) -> DaemonResult<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(DaemonError::scheduler("scheduler is already running"));
        }

        self.engine.load_state().await?;
        self.engine
            .set_auto_sync_enabled(*self.auto_sync_tx.borrow())
            .await;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.engine),
            self.interval,
            self.auto_sync_tx.subscribe(),
            shutdown_rx,
        ));
        *self.shutdown_tx.lock().await = Some(shutdown_tx);
        *task = Some(handle);

        info!("scheduler started, sync interval {:?}", self.interval);
        Ok(())
    }

    /// Enable periodic pulls without a restart
    pub async fn enable_auto_sync(&self) {
        let _ = self.auto_sync_tx.send(true);
        self.engine.set_auto_sync_enabled(true).await;
        debug!("auto-sync enabled");
    }

    /// Disable periodic pulls and cancel the pending timer
    pub async fn disable_auto_sync(&self) {
        let _ = self.auto_sync_tx.send(false);
        self.engine.set_auto_sync_enabled(false).await;
        debug!("auto-sync disabled");
    }

    /// Stop the loop, wait for in-flight work up to the bound, then clear
    /// engine state.
    ///
    /// Operations still running past the bound are force-failed rather
    /// than left dangling.
    pub async fn stop(&self) -> DaemonResult<()> {
        let handle = self.task.lock().await.take();
        let Some(handle) = handle else {
            return Err(DaemonError::scheduler("scheduler is not running"));
        };

        if let Some(shutdown) = self.shutdown_tx.lock().await.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = handle.await {
            warn!("scheduler loop ended abnormally: {}", err);
        }

        let deadline = Instant::now() + self.stop_timeout;
        while self.engine.in_flight_count().await > 0 {
            if Instant::now() >= deadline {
                let aborted = self.engine.abort_in_flight("interrupted by shutdown").await;
                warn!(
                    "shutdown wait exceeded {:?}, force-failed {} operation(s)",
                    self.stop_timeout, aborted
                );
                break;
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }

        self.engine.clear_state().await;
        info!("scheduler stopped");
        Ok(())
    }
}

async fn run_loop(
    engine: Arc<SyncEngine>,
    interval: Duration,
    mut enabled_rx: watch::Receiver<bool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let enabled = *enabled_rx.borrow();
        if !enabled {
            engine.set_next_sync(None).await;
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                changed = enabled_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let next = Utc::now()
            + chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        engine.set_next_sync(Some(next)).await;

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            changed = enabled_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // Toggled mid-wait; re-evaluate from the top
                continue;
            }
            _ = tokio::time::sleep(interval) => {
                match engine.trigger_sync(SyncKind::Pull).await {
                    Ok(operation) if operation.status == OperationStatus::Failed => {
                        warn!(
                            "scheduled pull {} failed: {}",
                            operation.id,
                            operation.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    Ok(operation) => {
                        debug!(
                            "scheduled pull {} applied {} change(s)",
                            operation.id,
                            operation.changes.len()
                        );
                    }
                    Err(err) => error!("scheduled pull could not run: {}", err),
                }
            }
        }
    }

    engine.set_next_sync(None).await;
}
