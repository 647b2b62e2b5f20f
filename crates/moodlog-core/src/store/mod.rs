//! Keyed blob persistence backing the record store and detail cache.
//!
//! Both durable surfaces (the full-collection mirror and the per-entry
//! detail cache) sit on the same small trait so tests and ephemeral
//! sessions can swap in an in-memory store.

mod entries;

pub use entries::EntryStore;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;
#[cfg(test)]
use crate::error::Error;

/// Durable keyed blob storage.
///
/// Reads never fail: missing or unreadable data degrades to `None`, because
/// local blobs are a best-effort accelerator, never a source of truth.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, if any.
    fn read(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `bytes` under `key`, overwriting any prior blob.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the blob under `key`. Idempotent if absent.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every blob whose key starts with `prefix`.
    fn remove_prefix(&self, prefix: &str) -> Result<()>;
}

/// Filesystem-backed blob store: one JSON file per key under a data dir.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), bytes)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn remove_prefix(&self, prefix: &str) -> Result<()> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(error.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(prefix) && name.ends_with(".json") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

/// In-memory blob store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn remove_prefix(&self, prefix: &str) -> Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

/// A blob store that refuses writes, for exercising failure paths in tests.
#[cfg(test)]
pub(crate) struct ReadOnlyBlobStore;

#[cfg(test)]
impl BlobStore for ReadOnlyBlobStore {
    fn read(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn write(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
        Err(Error::Storage("read-only store".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(Error::Storage("read-only store".to_string()))
    }

    fn remove_prefix(&self, _prefix: &str) -> Result<()> {
        Err(Error::Storage("read-only store".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_blobs() {
        let store = MemoryBlobStore::new();
        store.write("entries", b"[1,2,3]").unwrap();
        assert_eq!(store.read("entries"), Some(b"[1,2,3]".to_vec()));

        store.remove("entries").unwrap();
        assert_eq!(store.read("entries"), None);
        // Removing again stays fine.
        store.remove("entries").unwrap();
    }

    #[test]
    fn memory_store_remove_prefix_is_selective() {
        let store = MemoryBlobStore::new();
        store.write("detail-1", b"a").unwrap();
        store.write("detail-2", b"b").unwrap();
        store.write("entries", b"c").unwrap();

        store.remove_prefix("detail-").unwrap();
        assert_eq!(store.read("detail-1"), None);
        assert_eq!(store.read("detail-2"), None);
        assert_eq!(store.read("entries"), Some(b"c".to_vec()));
    }

    #[test]
    fn fs_store_round_trips_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        assert_eq!(store.read("entries"), None);
        store.write("entries", b"{}").unwrap();
        assert_eq!(store.read("entries"), Some(b"{}".to_vec()));

        store.remove("entries").unwrap();
        assert_eq!(store.read("entries"), None);
        store.remove("entries").unwrap();
    }

    #[test]
    fn fs_store_remove_prefix_handles_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("never-created"));
        store.remove_prefix("detail-").unwrap();
    }

    #[test]
    fn fs_store_remove_prefix_is_selective() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.write("detail-41", b"a").unwrap();
        store.write("detail-42", b"b").unwrap();
        store.write("entries", b"c").unwrap();

        store.remove_prefix("detail-").unwrap();
        assert_eq!(store.read("detail-41"), None);
        assert_eq!(store.read("detail-42"), None);
        assert_eq!(store.read("entries"), Some(b"c".to_vec()));
    }
}
