use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::content::ConfigContent;
use crate::error::ConfsyncResult;
use crate::sync::SyncChange;

/// Boundary to the reference copy of the watched configuration.
///
/// The engine only ever talks to the remote side through this trait; no
/// real transport ships with the core.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetch the remote record for a path, if one exists
    async fn fetch(&self, path: &Path) -> ConfsyncResult<Option<ConfigContent>>;

    /// Forward local changes to the remote
    async fn push(&self, changes: &[SyncChange]) -> ConfsyncResult<()>;
}

/// Remote store with no backing transport
#[derive(Debug, Default)]
pub struct NullRemote;

#[async_trait]
impl RemoteStore for NullRemote {
    async fn fetch(&self, _path: &Path) -> ConfsyncResult<Option<ConfigContent>> {
        Ok(None)
    }

    async fn push(&self, changes: &[SyncChange]) -> ConfsyncResult<()> {
        debug!(
            "push of {} change(s) skipped, no transport configured",
            changes.len()
        );
        Ok(())
    }
}

/// In-memory remote store for tests and local experiments
#[derive(Debug, Default)]
pub struct MemoryRemote {
    records: RwLock<HashMap<PathBuf, ConfigContent>>,
    pushed: RwLock<Vec<SyncChange>>,
}

impl MemoryRemote {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace the record for a path
    pub async fn insert(&self, path: impl Into<PathBuf>, content: ConfigContent) {
        self.records.write().await.insert(path.into(), content);
    }

    /// Changes received through `push` so far
    pub async fn pushed(&self) -> Vec<SyncChange> {
        self.pushed.read().await.clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch(&self, path: &Path) -> ConfsyncResult<Option<ConfigContent>> {
        Ok(self.records.read().await.get(path).cloned())
    }

    async fn push(&self, changes: &[SyncChange]) -> ConfsyncResult<()> {
        self.pushed.write().await.extend_from_slice(changes);
        Ok(())
    }
}
