use confsync_core::error::ConfsyncError;

/// Daemon error types
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Core engine error
    #[error("Core error: {0}")]
    Core(#[from] ConfsyncError),
}

impl DaemonError {
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
