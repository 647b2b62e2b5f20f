//! Per-entry detail cache with time-to-live expiry.
//!
//! Keyed by server id; caching detail bodies is meaningless for entries
//! that were never synced. Records past their TTL are treated as absent
//! and purged lazily on read.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Entry, ServerId};
use crate::store::BlobStore;
use crate::util::unix_timestamp_ms;

/// Maximum age of a cached detail record: 24 hours, in milliseconds.
pub const DETAIL_TTL_MS: i64 = 24 * 60 * 60 * 1000;

const DETAIL_KEY_PREFIX: &str = "detail-";

/// A cached entry body plus the time it was fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedDetail {
    entry: Entry,
    fetched_at: i64,
}

impl CachedDetail {
    const fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.fetched_at < DETAIL_TTL_MS
    }
}

/// TTL-bound cache of full entry bodies, keyed by server id.
#[derive(Clone)]
pub struct DetailCache {
    blobs: Arc<dyn BlobStore>,
}

impl DetailCache {
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Return the cached entry for `server_id` if present and unexpired.
    ///
    /// A found-but-expired record is purged as a side effect and reported
    /// as a miss. Unreadable records are also a miss, never an error.
    #[must_use]
    pub fn get(&self, server_id: ServerId) -> Option<Entry> {
        self.get_at(server_id, unix_timestamp_ms())
    }

    fn get_at(&self, server_id: ServerId, now_ms: i64) -> Option<Entry> {
        let key = detail_key(server_id);
        let bytes = self.blobs.read(&key)?;
        let Ok(record) = serde_json::from_slice::<CachedDetail>(&bytes) else {
            tracing::debug!(%server_id, "discarding unreadable detail record");
            let _ = self.blobs.remove(&key);
            return None;
        };

        if record.is_fresh(now_ms) {
            Some(record.entry)
        } else {
            tracing::debug!(%server_id, "purging expired detail record");
            let _ = self.blobs.remove(&key);
            None
        }
    }

    /// Store `entry` under `server_id`, stamped with the current time,
    /// overwriting any prior record for that id.
    pub fn put(&self, server_id: ServerId, entry: &Entry) -> Result<()> {
        self.put_at(server_id, entry, unix_timestamp_ms())
    }

    fn put_at(&self, server_id: ServerId, entry: &Entry, now_ms: i64) -> Result<()> {
        let record = CachedDetail {
            entry: entry.clone(),
            fetched_at: now_ms,
        };
        let bytes = serde_json::to_vec(&record)?;
        self.blobs.write(&detail_key(server_id), &bytes)
    }

    /// Remove any cached record for `server_id`. Idempotent if absent.
    pub fn invalidate(&self, server_id: ServerId) -> Result<()> {
        self.blobs.remove(&detail_key(server_id))
    }

    /// Drop every cached detail record.
    pub fn clear(&self) -> Result<()> {
        self.blobs.remove_prefix(DETAIL_KEY_PREFIX)
    }
}

fn detail_key(server_id: ServerId) -> String {
    format!("{DETAIL_KEY_PREFIX}{server_id}")
}
