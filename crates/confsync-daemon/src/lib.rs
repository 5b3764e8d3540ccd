//! Scheduler service for the confsync engine.
//!
//! This crate drives the core engine on a periodic pull schedule and owns
//! the cooperative shutdown path around it.

pub mod error;
pub mod scheduler;

// Re-export commonly used types
pub use error::{DaemonError, DaemonResult};
pub use scheduler::{SyncScheduler, DEFAULT_STOP_TIMEOUT};
