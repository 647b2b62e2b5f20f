//! Process-wide change notification bus.
//!
//! Best-effort, in-process broadcast with no persistence or replay:
//! subscribers active at publish time receive the event, others catch up by
//! re-reading the record store on their own lifecycle. Delivery order is
//! only guaranteed per publisher.

use tokio::sync::broadcast;

use crate::models::ServerId;

/// The closed set of change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEvent {
    /// The entry with this server id was created or updated.
    EntryUpdated { server_id: ServerId },
    /// An entry was removed; `server_id` is `None` for entries that never
    /// reached the server.
    EntryDeleted { server_id: Option<ServerId> },
    /// The session credential was rejected and has been torn down.
    SessionInvalidated,
}

/// Multi-producer, multi-consumer broadcast of [`JournalEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<JournalEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JournalEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; the event is simply
    /// dropped.
    pub fn publish(&self, event: JournalEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}
