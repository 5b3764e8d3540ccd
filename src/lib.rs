//! Confsync configuration synchronization engine.
//!
//! This crate re-exports the core drift-detection engine and the
//! scheduler daemon behind a single facade.

pub use confsync_core as core;
pub use confsync_daemon as daemon;

/// Initialize logging for the entire system
pub fn init() {
    tracing_subscriber::fmt::init();
}

/// Version of the confsync system
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
