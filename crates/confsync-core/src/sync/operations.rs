use std::collections::VecDeque;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::conflicts::SyncConflict;
use super::types::{ResolutionStrategy, SyncChange, SyncKind};

/// Status of a sync operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Created but not yet running
    Pending,
    /// Detection or application in progress
    Running,
    /// Finished successfully
    Completed,
    /// Finished with a captured error
    Failed,
}

impl OperationStatus {
    /// Whether the status is final
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

/// One bounded reconciliation attempt, tracked by a state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Operation ID
    pub id: String,
    /// Operation kind
    pub kind: SyncKind,
    /// Lifecycle status
    pub status: OperationStatus,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// Completion timestamp
    pub completed_at: Option<DateTime<Utc>>,
    /// Changes this operation detected and applied
    pub changes: Vec<SyncChange>,
    /// Conflicts this operation raised
    pub conflicts: Vec<SyncConflict>,
    /// Captured error for failed operations
    pub error: Option<String>,
}

impl SyncOperation {
    /// Create a pending operation with a fresh id
    pub fn new(kind: SyncKind) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8]),
            kind,
            status: OperationStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            changes: Vec::new(),
            conflicts: Vec::new(),
            error: None,
        }
    }

    /// Move the operation to `Running`
    pub fn begin(&mut self) {
        self.transition(OperationStatus::Running);
    }

    /// Mark the operation completed
    pub fn complete(&mut self) {
        self.transition(OperationStatus::Completed);
        self.completed_at = Some(Utc::now());
    }

    /// Mark the operation failed with a captured error
    pub fn fail(&mut self, error: impl Into<String>) {
        self.transition(OperationStatus::Failed);
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    // Terminal states are final; a backward transition is ignored.
    fn transition(&mut self, next: OperationStatus) {
        if self.status.is_terminal() {
            warn!("operation {} is terminal, ignoring transition", self.id);
            return;
        }
        self.status = next;
    }
}

/// Fixed-capacity, append-only operation history.
///
/// The oldest entry is evicted silently once the capacity is exceeded.
#[derive(Debug)]
pub struct OperationHistory {
    entries: VecDeque<SyncOperation>,
    capacity: usize,
}

impl OperationHistory {
    /// Create a history bounded to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a terminal operation, evicting the oldest past capacity
    pub fn push(&mut self, operation: SyncOperation) {
        if self.capacity > 0 && self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(operation);
    }

    /// Record the resolution on a conflict held by a past operation
    pub fn mark_resolved(&mut self, operation_id: &str, path: &Path, strategy: ResolutionStrategy) {
        if let Some(operation) = self.entries.iter_mut().find(|op| op.id == operation_id) {
            if let Some(conflict) = operation.conflicts.iter_mut().find(|c| c.path == path) {
                conflict.resolution = Some(strategy);
            }
        }
    }

    /// Number of retained operations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained operations, oldest first
    pub fn snapshot(&self) -> Vec<SyncOperation> {
        self.entries.iter().cloned().collect()
    }
}

/// Derived view of the engine, computed on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether any operation is currently in flight
    pub is_running: bool,
    /// Whether the scheduler's periodic pull loop is enabled
    pub auto_sync_enabled: bool,
    /// Completion time of the last successful operation
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Next scheduled pull, when auto-sync is armed
    pub next_sync_time: Option<DateTime<Utc>>,
    /// Number of unapplied drift changes on disk
    pub pending_changes: usize,
    /// Conflicts awaiting resolution
    pub unresolved_conflicts: Vec<SyncConflict>,
    /// Recent operations, oldest first
    pub history: Vec<SyncOperation>,
}
