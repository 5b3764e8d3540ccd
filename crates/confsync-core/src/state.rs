use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::SyncConfig;
use crate::content::ConfigContent;
use crate::error::{ConfsyncError, ConfsyncResult};
use crate::sync::{ChangeKind, SyncChange};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Recorded state of a single watched configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigState {
    /// File path
    pub path: PathBuf,
    /// Parsed content at the last load or successful write
    pub content: ConfigContent,
    /// Digest of the canonical serialization of `content`
    pub hash: String,
    /// Modification time observed alongside `content`
    pub last_modified: DateTime<Utc>,
}

/// Options governing the disk write path
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Retry attempts after a failed write or delete
    pub max_retries: u32,
    /// Directory receiving pre-write backup copies
    pub backup_path: Option<PathBuf>,
}

impl From<&SyncConfig> for WriteOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backup_path: config.backup_path.clone(),
        }
    }
}

/// Content-hashed snapshot of every watched configuration file.
///
/// Entries are keyed by full path in a `BTreeMap`, so iteration and the
/// change lists derived from it come out in stable path order.
#[derive(Debug)]
pub struct StateStore {
    roots: Vec<PathBuf>,
    entries: BTreeMap<PathBuf, ConfigState>,
}

impl StateStore {
    /// Create a store over the given watched directories
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            entries: BTreeMap::new(),
        }
    }

    /// Rebuild the snapshot from disk.
    ///
    /// Missing roots are skipped with a warning; a file that fails to
    /// parse is logged and excluded without aborting the pass.
    pub async fn load(&mut self) -> ConfsyncResult<()> {
        self.entries.clear();

        for root in &self.roots {
            if !root.exists() {
                warn!("watched path {} does not exist, skipping", root.display());
                continue;
            }

            for path in Self::list_files(root) {
                match Self::read_entry(&path).await {
                    Ok(entry) => {
                        self.entries.insert(path, entry);
                    }
                    Err(err) => {
                        warn!("excluding {} from state: {}", path.display(), err);
                    }
                }
            }
        }

        debug!("loaded state for {} file(s)", self.entries.len());
        Ok(())
    }

    /// Diff disk against the snapshot without touching it.
    ///
    /// A root that is missing at scan time is skipped and its recorded
    /// entries are left alone rather than reported as deletions.
    pub async fn scan(&self) -> Vec<SyncChange> {
        let mut changes = Vec::new();
        let mut seen = BTreeSet::new();

        for root in &self.roots {
            if !root.exists() {
                warn!("watched path {} does not exist, skipping", root.display());
                continue;
            }

            for path in Self::list_files(root) {
                seen.insert(path.clone());
                let current = match Self::read_entry(&path).await {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("skipping {} during scan: {}", path.display(), err);
                        continue;
                    }
                };

                match self.entries.get(&path) {
                    None => changes.push(SyncChange::created(path, current.content)),
                    Some(prev) if prev.hash != current.hash => changes.push(
                        SyncChange::updated(path, prev.content.clone(), current.content),
                    ),
                    Some(_) => {}
                }
            }
        }

        for (path, prev) in &self.entries {
            if seen.contains(path) {
                continue;
            }
            if self
                .roots
                .iter()
                .any(|root| path.starts_with(root) && root.exists())
            {
                changes.push(SyncChange::deleted(path.clone(), prev.content.clone()));
            }
        }

        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }

    /// Diff disk against the snapshot and commit the observed state, so an
    /// immediately repeated call reports nothing
    pub async fn detect_changes(&mut self) -> ConfsyncResult<Vec<SyncChange>> {
        let changes = self.scan().await;
        for change in &changes {
            self.record(change)?;
        }
        Ok(changes)
    }

    /// Apply a change to disk and fold it into the snapshot on success
    pub async fn apply_change(
        &mut self,
        change: &SyncChange,
        options: &WriteOptions,
    ) -> ConfsyncResult<()> {
        match change.kind {
            ChangeKind::Create | ChangeKind::Update => {
                let after = change.after.as_ref().ok_or_else(|| {
                    ConfsyncError::state(format!(
                        "change for {} carries no content",
                        change.path.display()
                    ))
                })?;
                self.write_content(&change.path, after, options).await?;
            }
            ChangeKind::Delete => {
                self.remove_path(&change.path, options).await?;
                self.entries.remove(&change.path);
            }
        }
        Ok(())
    }

    /// Write content to disk with backup and retry, then update the entry
    pub async fn write_content(
        &mut self,
        path: &Path,
        content: &ConfigContent,
        options: &WriteOptions,
    ) -> ConfsyncResult<()> {
        Self::backup_existing(path, options).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let rendered = content.to_file_string()?;
        let mut attempt = 0;
        loop {
            match tokio::fs::write(path, &rendered).await {
                Ok(()) => break,
                Err(err) if attempt < options.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        "write to {} failed ({}), retrying in {:?}",
                        path.display(),
                        err,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(ConfsyncError::from(err)),
            }
        }

        self.insert_entry(path.to_path_buf(), content.clone(), Utc::now())
    }

    /// Accept a local value into the snapshot without touching disk
    pub fn accept_local(
        &mut self,
        path: &Path,
        content: Option<ConfigContent>,
    ) -> ConfsyncResult<()> {
        match content {
            Some(content) => self.insert_entry(path.to_path_buf(), content, Utc::now()),
            None => {
                self.entries.remove(path);
                Ok(())
            }
        }
    }

    /// Recorded state for a path, if any
    pub fn entry(&self, path: &Path) -> Option<&ConfigState> {
        self.entries.get(path)
    }

    /// Number of files in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn list_files(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .collect()
    }

    async fn read_entry(path: &Path) -> ConfsyncResult<ConfigState> {
        let raw = tokio::fs::read_to_string(path).await?;
        let content = ConfigContent::parse(path, &raw)?;
        let hash = content.digest()?;
        let last_modified = tokio::fs::metadata(path)
            .await
            .and_then(|meta| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(ConfigState {
            path: path.to_path_buf(),
            content,
            hash,
            last_modified,
        })
    }

    fn record(&mut self, change: &SyncChange) -> ConfsyncResult<()> {
        match change.kind {
            ChangeKind::Create | ChangeKind::Update => {
                if let Some(after) = &change.after {
                    self.insert_entry(change.path.clone(), after.clone(), change.timestamp)?;
                }
            }
            ChangeKind::Delete => {
                self.entries.remove(&change.path);
            }
        }
        Ok(())
    }

    fn insert_entry(
        &mut self,
        path: PathBuf,
        content: ConfigContent,
        last_modified: DateTime<Utc>,
    ) -> ConfsyncResult<()> {
        let hash = content.digest()?;
        self.entries.insert(
            path.clone(),
            ConfigState {
                path,
                content,
                hash,
                last_modified,
            },
        );
        Ok(())
    }

    async fn remove_path(&self, path: &Path, options: &WriteOptions) -> ConfsyncResult<()> {
        if !path.exists() {
            return Ok(());
        }

        Self::backup_existing(path, options).await?;

        let mut attempt = 0;
        loop {
            match tokio::fs::remove_file(path).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < options.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        "delete of {} failed ({}), retrying in {:?}",
                        path.display(),
                        err,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(ConfsyncError::from(err)),
            }
        }
    }

    async fn backup_existing(path: &Path, options: &WriteOptions) -> ConfsyncResult<()> {
        let Some(backup_dir) = &options.backup_path else {
            return Ok(());
        };
        if !path.is_file() {
            return Ok(());
        }

        tokio::fs::create_dir_all(backup_dir).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unnamed");
        let backup = backup_dir.join(format!("{}.{}", file_name, Utc::now().timestamp_millis()));
        tokio::fs::copy(path, &backup).await?;
        debug!("backed up {} to {}", path.display(), backup.display());
        Ok(())
    }
}
