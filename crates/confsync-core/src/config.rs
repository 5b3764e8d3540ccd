use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfsyncError, ConfsyncResult};
use crate::sync::ResolutionStrategy;

/// Configuration for the sync engine and scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Enable the scheduler's periodic pull loop
    pub auto_sync: bool,
    /// Interval between scheduled pulls, in milliseconds
    pub sync_interval_ms: u64,
    /// Write/delete retry attempts on I/O errors
    pub max_retries: u32,
    /// Directories holding the watched configuration files
    pub config_paths: Vec<PathBuf>,
    /// Directory receiving pre-write backup copies
    pub backup_path: Option<PathBuf>,
    /// Default strategy applied to fresh merge conflicts
    pub conflict_resolution: ResolutionStrategy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval_ms: 300_000,
            max_retries: 3,
            config_paths: Vec::new(),
            backup_path: None,
            conflict_resolution: ResolutionStrategy::Manual,
        }
    }
}

impl SyncConfig {
    /// Create a configuration watching the given directories
    pub fn new(config_paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfsyncResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfsyncResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Interval between scheduled pulls
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfsyncResult<()> {
        if self.config_paths.is_empty() {
            return Err(ConfsyncError::config("no configuration paths to watch"));
        }

        if self.sync_interval_ms == 0 {
            return Err(ConfsyncError::config("sync interval must be non-zero"));
        }

        // Backup artifacts inside a watched root would read back as drift
        if let Some(backup) = &self.backup_path {
            for root in &self.config_paths {
                if backup.starts_with(root) {
                    return Err(ConfsyncError::config(format!(
                        "backup path {} is inside watched path {}",
                        backup.display(),
                        root.display()
                    )));
                }
            }
        }

        Ok(())
    }
}
