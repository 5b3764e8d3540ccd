use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::content::merge_shallow;
use crate::error::{ConfsyncError, ConfsyncResult};
use crate::events::{EventBus, SyncEvent};
use crate::remote::RemoteStore;
use crate::state::{StateStore, WriteOptions};

use super::conflicts::{detect_conflict, SyncConflict};
use super::operations::{OperationHistory, OperationStatus, SyncOperation, SyncStatus};
use super::types::{ResolutionStrategy, SyncChange, SyncKind};

/// Number of terminal operations retained in history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A conflict awaiting resolution, tied to the operation that raised it
#[derive(Debug, Clone)]
struct PendingConflict {
    operation_id: String,
    conflict: SyncConflict,
}

/// Orchestrator for pull/push/merge operations over the watched set
pub struct SyncEngine {
    config: SyncConfig,
    write_options: WriteOptions,
    state: RwLock<StateStore>,
    remote: Arc<dyn RemoteStore>,
    events: EventBus,
    in_flight: RwLock<HashMap<String, SyncOperation>>,
    history: RwLock<OperationHistory>,
    conflicts: RwLock<HashMap<PathBuf, PendingConflict>>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    next_sync: RwLock<Option<DateTime<Utc>>>,
    auto_sync_enabled: RwLock<bool>,
    // Serializes operation bodies so overlapping triggers cannot race on
    // the same files.
    op_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create an engine over the configured watch set and remote boundary
    pub fn new(config: SyncConfig, remote: Arc<dyn RemoteStore>) -> Self {
        let write_options = WriteOptions::from(&config);
        let state = StateStore::new(config.config_paths.clone());
        let auto_sync = config.auto_sync;

        Self {
            config,
            write_options,
            state: RwLock::new(state),
            remote,
            events: EventBus::default(),
            in_flight: RwLock::new(HashMap::new()),
            history: RwLock::new(OperationHistory::new(DEFAULT_HISTORY_LIMIT)),
            conflicts: RwLock::new(HashMap::new()),
            last_sync: RwLock::new(None),
            next_sync: RwLock::new(None),
            auto_sync_enabled: RwLock::new(auto_sync),
            op_lock: Mutex::new(()),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Build the content-hashed snapshot of every watched path
    pub async fn load_state(&self) -> ConfsyncResult<()> {
        self.state.write().await.load().await
    }

    /// Drop the snapshot and all pending conflict bookkeeping
    pub async fn clear_state(&self) {
        self.state.write().await.clear();
        self.conflicts.write().await.clear();
        *self.next_sync.write().await = None;
    }

    /// Diff disk against the snapshot and commit the observed state.
    ///
    /// An immediately repeated call with no intervening writes reports
    /// nothing.
    pub async fn detect_changes(&self) -> ConfsyncResult<Vec<SyncChange>> {
        self.state.write().await.detect_changes().await
    }

    /// Trigger one sync operation and drive it to a terminal status.
    ///
    /// Operation-level failures are captured on the returned operation; an
    /// `Err` from this method means the engine could not run it at all.
    pub async fn trigger_sync(&self, kind: SyncKind) -> ConfsyncResult<SyncOperation> {
        let mut operation = SyncOperation::new(kind);
        self.in_flight
            .write()
            .await
            .insert(operation.id.clone(), operation.clone());
        self.events.emit(SyncEvent::SyncStarted(operation.clone()));

        operation.begin();
        if let Some(tracked) = self.in_flight.write().await.get_mut(&operation.id) {
            tracked.begin();
        }

        let guard = self.op_lock.lock().await;
        let result = match kind {
            SyncKind::Pull => self.run_pull(&mut operation).await,
            SyncKind::Push => self.run_push(&mut operation).await,
            SyncKind::Merge => self.run_merge(&mut operation).await,
        };
        drop(guard);

        match result {
            Ok(()) => {
                operation.complete();
                *self.last_sync.write().await = Some(Utc::now());
            }
            Err(err) => {
                warn!("{:?} operation {} failed: {}", kind, operation.id, err);
                operation.fail(err.to_string());
            }
        }

        // A forced shutdown may already have failed this id; only the
        // tracked copy gets history and completion events.
        let tracked = self
            .in_flight
            .write()
            .await
            .remove(&operation.id)
            .is_some();
        if tracked {
            self.history.write().await.push(operation.clone());
            match operation.status {
                OperationStatus::Completed => {
                    self.events.emit(SyncEvent::SyncCompleted(operation.clone()));
                }
                _ => self.events.emit(SyncEvent::SyncFailed(operation.clone())),
            }
        }

        Ok(operation)
    }

    /// Resolve a pending conflict with an explicit strategy
    pub async fn resolve_conflict(
        &self,
        path: &Path,
        strategy: ResolutionStrategy,
    ) -> ConfsyncResult<SyncConflict> {
        self.resolve_pending(path, strategy).await
    }

    /// Compute the derived status aggregate
    pub async fn status(&self) -> SyncStatus {
        let pending_changes = self.state.read().await.scan().await.len();
        let unresolved_conflicts = self
            .conflicts
            .read()
            .await
            .values()
            .map(|pending| pending.conflict.clone())
            .collect();

        SyncStatus {
            is_running: !self.in_flight.read().await.is_empty(),
            auto_sync_enabled: *self.auto_sync_enabled.read().await,
            last_sync_time: *self.last_sync.read().await,
            next_sync_time: *self.next_sync.read().await,
            pending_changes,
            unresolved_conflicts,
            history: self.history.read().await.snapshot(),
        }
    }

    /// Number of operations currently in flight
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.read().await.len()
    }

    /// Record or clear the next scheduled pull time
    pub async fn set_next_sync(&self, at: Option<DateTime<Utc>>) {
        *self.next_sync.write().await = at;
    }

    /// Record the auto-sync toggle for status reporting
    pub async fn set_auto_sync_enabled(&self, enabled: bool) {
        *self.auto_sync_enabled.write().await = enabled;
    }

    /// Force-fail every in-flight operation, returning how many were failed
    pub async fn abort_in_flight(&self, reason: &str) -> usize {
        let drained: Vec<SyncOperation> = self
            .in_flight
            .write()
            .await
            .drain()
            .map(|(_, operation)| operation)
            .collect();

        let count = drained.len();
        for mut operation in drained {
            operation.fail(reason);
            self.history.write().await.push(operation.clone());
            self.events.emit(SyncEvent::SyncFailed(operation));
        }
        count
    }

    // Pulls blind-apply every detected change; the watched set is assumed
    // to have a single authoritative source.
    async fn run_pull(&self, operation: &mut SyncOperation) -> ConfsyncResult<()> {
        let mut state = self.state.write().await;
        let changes = state.scan().await;
        operation.changes = changes.clone();

        for change in &changes {
            state.apply_change(change, &self.write_options).await?;
        }

        debug!(
            "pull {} applied {} change(s)",
            operation.id,
            operation.changes.len()
        );
        Ok(())
    }

    async fn run_push(&self, operation: &mut SyncOperation) -> ConfsyncResult<()> {
        let changes = self.state.write().await.detect_changes().await?;
        self.remote.push(&changes).await?;
        operation.changes = changes;

        debug!(
            "push {} forwarded {} change(s)",
            operation.id,
            operation.changes.len()
        );
        Ok(())
    }

    async fn run_merge(&self, operation: &mut SyncOperation) -> ConfsyncResult<()> {
        let changes = self.state.read().await.scan().await;
        let mut applied = Vec::new();

        for change in changes {
            let remote = self.remote.fetch(&change.path).await?;
            match detect_conflict(&change, remote.as_ref())? {
                Some(conflict) => {
                    self.conflicts.write().await.insert(
                        change.path.clone(),
                        PendingConflict {
                            operation_id: operation.id.clone(),
                            conflict: conflict.clone(),
                        },
                    );
                    operation.conflicts.push(conflict);
                }
                None => {
                    self.state
                        .write()
                        .await
                        .apply_change(&change, &self.write_options)
                        .await?;
                    applied.push(change);
                }
            }
        }
        operation.changes = applied;

        if self.config.conflict_resolution != ResolutionStrategy::Manual
            && !operation.conflicts.is_empty()
        {
            let strategy = self.config.conflict_resolution;
            info!(
                "auto-resolving {} conflict(s) with {:?} strategy",
                operation.conflicts.len(),
                strategy
            );
            for conflict in &mut operation.conflicts {
                let path = conflict.path.clone();
                let resolved = self.resolve_pending(&path, strategy).await?;
                conflict.resolution = resolved.resolution;
            }
        }

        Ok(())
    }

    async fn resolve_pending(
        &self,
        path: &Path,
        strategy: ResolutionStrategy,
    ) -> ConfsyncResult<SyncConflict> {
        if strategy == ResolutionStrategy::Manual {
            return Err(ConfsyncError::conflict(
                "manual is not an applicable resolution strategy",
            ));
        }

        let pending = self.conflicts.write().await.remove(path).ok_or_else(|| {
            ConfsyncError::conflict(format!(
                "no unresolved conflict found for {}",
                path.display()
            ))
        })?;

        let write_result = match strategy {
            ResolutionStrategy::Local => {
                debug!("keeping local value for {}", path.display());
                self.state
                    .write()
                    .await
                    .accept_local(path, pending.conflict.local.clone())
            }
            ResolutionStrategy::Remote => {
                self.state
                    .write()
                    .await
                    .write_content(path, &pending.conflict.remote, &self.write_options)
                    .await
            }
            ResolutionStrategy::Merge => {
                let merged =
                    merge_shallow(pending.conflict.local.as_ref(), &pending.conflict.remote);
                self.state
                    .write()
                    .await
                    .write_content(path, &merged, &self.write_options)
                    .await
            }
            ResolutionStrategy::Manual => Ok(()),
        };

        if let Err(err) = write_result {
            self.conflicts
                .write()
                .await
                .insert(path.to_path_buf(), pending);
            return Err(err);
        }

        let PendingConflict {
            operation_id,
            mut conflict,
        } = pending;
        conflict.resolution = Some(strategy);
        self.history
            .write()
            .await
            .mark_resolved(&operation_id, path, strategy);
        self.events
            .emit(SyncEvent::ConflictResolved(conflict.clone()));

        Ok(conflict)
    }
}
