//! Local record store: the offline mirror of the journal collection.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Entry, LocalId};

use super::BlobStore;

/// Storage key holding the serialized full entry collection.
const ENTRIES_KEY: &str = "entries";

/// Whole-collection mirror with replace-all write semantics.
///
/// This is the offline source of truth for list views. Writes always
/// replace the entire collection; the sync coordinator is responsible for
/// computing the full desired set before calling [`EntryStore::save_all`].
#[derive(Clone)]
pub struct EntryStore {
    blobs: Arc<dyn BlobStore>,
}

impl EntryStore {
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Load the entire stored collection.
    ///
    /// Missing or corrupt data degrades to an empty list, never an error:
    /// a broken offline cache means "no offline entries", not a crash.
    #[must_use]
    pub fn load_all(&self) -> Vec<Entry> {
        let Some(bytes) = self.blobs.read(ENTRIES_KEY) else {
            return Vec::new();
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable entry collection");
                Vec::new()
            }
        }
    }

    /// Serialize and overwrite the entire stored collection.
    pub fn save_all(&self, entries: &[Entry]) -> Result<()> {
        let bytes = serde_json::to_vec(entries)?;
        self.blobs.write(ENTRIES_KEY, &bytes)
    }

    /// Remove the entry with the given local id from the stored collection.
    pub fn delete(&self, local_id: LocalId) -> Result<()> {
        let mut entries = self.load_all();
        entries.retain(|entry| entry.local_id() != local_id);
        self.save_all(&entries)
    }
}
