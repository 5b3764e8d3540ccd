use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ConfigContent;

/// Kind of sync operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    /// Accept the authoritative source wholesale
    Pull,
    /// Forward local changes to the remote
    Push,
    /// Reconcile local and remote changes, deferring conflicts
    Merge,
}

/// Classification of a detected change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File present with no prior record
    Create,
    /// File content digest differs from the record
    Update,
    /// Recorded file gone from disk
    Delete,
}

/// A single detected difference between disk and the recorded snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncChange {
    /// File the change applies to
    pub path: PathBuf,
    /// Change classification
    pub kind: ChangeKind,
    /// Recorded content before the change
    pub before: Option<ConfigContent>,
    /// Observed content after the change
    pub after: Option<ConfigContent>,
    /// Detection timestamp
    pub timestamp: DateTime<Utc>,
}

impl SyncChange {
    /// Change for a file with no prior record
    pub fn created(path: PathBuf, after: ConfigContent) -> Self {
        Self {
            path,
            kind: ChangeKind::Create,
            before: None,
            after: Some(after),
            timestamp: Utc::now(),
        }
    }

    /// Change for a file whose digest differs from the record
    pub fn updated(path: PathBuf, before: ConfigContent, after: ConfigContent) -> Self {
        Self {
            path,
            kind: ChangeKind::Update,
            before: Some(before),
            after: Some(after),
            timestamp: Utc::now(),
        }
    }

    /// Change for a recorded file that is gone from disk
    pub fn deleted(path: PathBuf, before: ConfigContent) -> Self {
        Self {
            path,
            kind: ChangeKind::Delete,
            before: Some(before),
            after: None,
            timestamp: Utc::now(),
        }
    }
}

/// Strategy for resolving a sync conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    /// Keep the local value, no disk write
    Local,
    /// Overwrite the local file with the remote value
    Remote,
    /// Shallow key union, remote winning overlaps
    Merge,
    /// Leave conflicts pending until resolved explicitly
    Manual,
}
