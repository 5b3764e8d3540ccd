//! Core engine for configuration synchronization and drift detection.
//!
//! This crate provides the content-hashed state snapshot, change and
//! conflict detection, resolution strategies, and the sync operation
//! orchestrator that make up the confsync engine.

pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod remote;
pub mod state;
pub mod sync;

// Re-export commonly used types
pub use crate::config::SyncConfig;
pub use crate::content::{merge_shallow, ConfigContent};
pub use crate::error::{ConfsyncError, ConfsyncResult};
pub use crate::events::{EventBus, SyncEvent};
pub use crate::remote::{MemoryRemote, NullRemote, RemoteStore};
pub use crate::state::{ConfigState, StateStore, WriteOptions};
pub use crate::sync::{
    detect_conflict, ChangeKind, OperationHistory, OperationStatus, ResolutionStrategy,
    SyncChange, SyncConflict, SyncEngine, SyncKind, SyncOperation, SyncStatus,
    DEFAULT_HISTORY_LIMIT,
};
