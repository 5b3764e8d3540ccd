use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom result type for confsync operations
pub type ConfsyncResult<T> = Result<T, ConfsyncError>;

/// Custom error type for confsync operations
#[derive(Debug, Error)]
pub enum ConfsyncError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Conflict error: {0}")]
    Conflict(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}

impl ConfsyncError {
    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::Parse(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::Serialization(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::Config(msg.into())
    }

    /// Create a new state error
    pub fn state<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::State(msg.into())
    }

    /// Create a new sync error
    pub fn sync<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::Sync(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::Conflict(msg.into())
    }

    /// Create a new remote error
    pub fn remote<S: Into<String>>(msg: S) -> Self {
        ConfsyncError::Remote(msg.into())
    }
}

impl From<io::Error> for ConfsyncError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfsyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfsyncError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ConfsyncError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfsyncError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
