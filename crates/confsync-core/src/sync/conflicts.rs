use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ConfigContent;
use crate::error::ConfsyncResult;

use super::types::{ChangeKind, ResolutionStrategy, SyncChange};

/// A path where local and remote changes disagree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflicting path
    pub path: PathBuf,
    /// Local result, absent when the local change was a deletion
    pub local: Option<ConfigContent>,
    /// Independently sourced remote value
    pub remote: ConfigContent,
    /// Strategy the conflict was resolved with, once resolved
    pub resolution: Option<ResolutionStrategy>,
    /// Conflict creation timestamp
    pub timestamp: DateTime<Utc>,
}

impl SyncConflict {
    fn new(path: PathBuf, local: Option<ConfigContent>, remote: ConfigContent) -> Self {
        Self {
            path,
            local,
            remote,
            resolution: None,
            timestamp: Utc::now(),
        }
    }
}

/// Decide whether a local change collides with the remote record.
///
/// Only merge operations consult this. A path with no remote record never
/// conflicts, and neither does a deletion with no remote counterpart.
pub fn detect_conflict(
    change: &SyncChange,
    remote: Option<&ConfigContent>,
) -> ConfsyncResult<Option<SyncConflict>> {
    let Some(remote) = remote else {
        return Ok(None);
    };

    match change.kind {
        ChangeKind::Delete => Ok(Some(SyncConflict::new(
            change.path.clone(),
            None,
            remote.clone(),
        ))),
        ChangeKind::Create | ChangeKind::Update => {
            let Some(after) = &change.after else {
                return Ok(None);
            };
            if after.digest()? == remote.digest()? {
                Ok(None)
            } else {
                Ok(Some(SyncConflict::new(
                    change.path.clone(),
                    Some(after.clone()),
                    remote.clone(),
                )))
            }
        }
    }
}
