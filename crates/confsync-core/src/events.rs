use tokio::sync::broadcast;

use crate::sync::{SyncConflict, SyncOperation};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle events emitted by the sync engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// An operation was created and registered
    SyncStarted(SyncOperation),
    /// An operation reached `Completed`
    SyncCompleted(SyncOperation),
    /// An operation reached `Failed`
    SyncFailed(SyncOperation),
    /// A conflict was resolved
    ConflictResolved(SyncConflict),
}

/// Broadcast fan-out for engine events.
///
/// Events carry snapshots taken at emit time. A send with no live
/// subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
