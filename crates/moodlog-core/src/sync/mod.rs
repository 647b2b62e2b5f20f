//! Sync coordinator: reconciles the server-authoritative collection with
//! the local mirror.
//!
//! Each operation is a one-shot async call with three outcomes: success,
//! recoverable failure (network/timeout, caller may retry), or unauthorized
//! (terminal; the session is torn down and a logout event broadcast from
//! here). Mutations invalidate the detail cache for the touched server id
//! strictly before the change notification goes out, so subscribers that
//! immediately re-read never observe stale cached data.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::{CreateEntryRequest, JournalApi, UpdateEntryRequest};
use crate::cache::DetailCache;
use crate::error::{Error, Result};
use crate::events::{EventBus, JournalEvent};
use crate::models::{AttachmentDiff, Emotion, Entry, EntryId, ServerId};
use crate::session::SessionStore;
use crate::store::EntryStore;

/// A partial update to one entry; `None` fields are left unchanged
/// server-side.
#[derive(Debug, Clone, Default)]
pub struct EntryChanges {
    pub content: Option<String>,
    pub emotion: Option<Emotion>,
    pub attachments: AttachmentDiff,
}

/// Orchestrates list refresh, entry mutation, detail fetching, and the
/// cache invalidation + change broadcast that follows every mutation.
pub struct SyncCoordinator {
    api: Arc<dyn JournalApi>,
    store: EntryStore,
    cache: DetailCache,
    sessions: Arc<dyn SessionStore>,
    bus: EventBus,
    /// Serializes replace-all writes under overlapping refreshes.
    write_lock: Mutex<()>,
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(
        api: Arc<dyn JournalApi>,
        store: EntryStore,
        cache: DetailCache,
        sessions: Arc<dyn SessionStore>,
        bus: EventBus,
    ) -> Self {
        Self {
            api,
            store,
            cache,
            sessions,
            bus,
            write_lock: Mutex::new(()),
        }
    }

    /// The offline mirror; list views read from here.
    #[must_use]
    pub const fn store(&self) -> &EntryStore {
        &self.store
    }

    /// The detail cache; exposed for explicit cache-clear flows.
    #[must_use]
    pub const fn cache(&self) -> &DetailCache {
        &self.cache
    }

    /// The change notification bus; subscribe around a view's visible
    /// lifetime.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Fetch one page of the remote collection and replace the local
    /// mirror wholesale.
    ///
    /// The full desired set written to the store is the fetched page,
    /// carrying over local identities for server ids already known, plus
    /// any surviving pending (never-synced) entries so offline drafts are
    /// not dropped. Returns the fetched sequence; overlapping calls are
    /// each internally consistent and the last completed write wins.
    pub async fn refresh_list(&self, limit: usize, offset: usize) -> Result<Vec<Entry>> {
        let token = self.access_token()?;
        let page = self.guard(self.api.list_entries(&token, limit, offset).await)?;

        let _write = self.write_lock.lock().await;
        let current = self.store.load_all();
        let known: HashMap<ServerId, (EntryId, bool)> = current
            .iter()
            .filter_map(|entry| entry.server_id().map(|id| (id, (entry.id, entry.edited))))
            .collect();

        let fetched: Vec<Entry> = page
            .entries
            .into_iter()
            .map(|record| match known.get(&ServerId::new(record.id)) {
                Some(&(id, edited)) => record.into_entry_as(id, edited),
                None => record.into_entry(),
            })
            .collect();

        let mut full: Vec<Entry> = current
            .into_iter()
            .filter(|entry| !entry.is_synced())
            .collect();
        full.extend(fetched.iter().cloned());
        self.store.save_all(&full)?;

        Ok(fetched)
    }

    /// Create an entry on the server and merge the result into the local
    /// mirror and detail cache before returning, so the list view the UI
    /// transitions to immediately shows it.
    pub async fn create_entry(
        &self,
        content: &str,
        emotion: Emotion,
        add_payloads: Vec<String>,
    ) -> Result<Entry> {
        let token = self.access_token()?;
        let request = CreateEntryRequest {
            content: content.to_string(),
            emotion: emotion.as_tag().to_string(),
            add_image_data: add_payloads,
        };
        let record = self.guard(self.api.create_entry(&token, &request).await)?;
        let server_id = ServerId::new(record.id);
        let entry = record.into_entry();

        if let Err(error) = self.cache.put(server_id, &entry) {
            tracing::warn!(%error, %server_id, "created entry not cached");
        }

        {
            let _write = self.write_lock.lock().await;
            let mut entries = self.store.load_all();
            entries.retain(|existing| existing.server_id() != Some(server_id));
            entries.insert(0, entry.clone());
            if let Err(error) = self.store.save_all(&entries) {
                // Accepted transient inconsistency; the mirror catches up
                // on the next refresh.
                tracing::warn!(%error, %server_id, "created entry not persisted locally");
            }
        }

        self.bus.publish(JournalEvent::EntryUpdated { server_id });
        Ok(entry)
    }

    /// Apply a partial update to a synced entry.
    ///
    /// On success the stale detail record is invalidated, the authoritative
    /// body is re-fetched (which also resolves server-assigned ids for any
    /// freshly added attachments), the mirror is patched in place, and the
    /// change is broadcast.
    pub async fn update_entry(&self, server_id: ServerId, changes: EntryChanges) -> Result<Entry> {
        let token = self.access_token()?;
        let content_changed = changes.content.is_some();
        let request = UpdateEntryRequest {
            content: changes.content,
            emotion: changes.emotion.map(|emotion| emotion.as_tag().to_string()),
            keep_image_ids: changes.attachments.keep_ids,
            add_image_data: changes.attachments.add_payloads,
        };

        let updated = self.guard(self.api.update_entry(&token, server_id, &request).await)?;
        tracing::debug!(%server_id, fields = ?updated, "entry updated");

        // Stale detail must be gone before anyone is told about the change.
        if let Err(error) = self.cache.invalidate(server_id) {
            tracing::warn!(%error, %server_id, "failed to invalidate detail record");
        }

        let entry = self
            .fetch_remote_detail(&token, server_id, content_changed)
            .await?;

        {
            let _write = self.write_lock.lock().await;
            let mut entries = self.store.load_all();
            if let Some(slot) = entries
                .iter_mut()
                .find(|existing| existing.server_id() == Some(server_id))
            {
                *slot = entry.clone();
            } else {
                entries.insert(0, entry.clone());
            }
            if let Err(error) = self.store.save_all(&entries) {
                tracing::warn!(%error, %server_id, "updated entry not persisted locally");
            }
        }

        self.bus.publish(JournalEvent::EntryUpdated { server_id });
        Ok(entry)
    }

    /// Remove an entry, optimistically: the local mirror and detail cache
    /// are updated and the deletion broadcast before the remote call.
    ///
    /// A failed remote delete is not rolled back; the inconsistency is
    /// logged and self-corrects on the next list refresh. Entries that
    /// never reached the server are removed purely locally.
    pub async fn delete_entry(&self, entry: &Entry) -> Result<()> {
        {
            let _write = self.write_lock.lock().await;
            self.store.delete(entry.local_id())?;
        }

        let server_id = entry.server_id();
        if let Some(id) = server_id {
            if let Err(error) = self.cache.invalidate(id) {
                tracing::warn!(%error, server_id = %id, "failed to invalidate detail record");
            }
        }
        self.bus.publish(JournalEvent::EntryDeleted { server_id });

        let Some(id) = server_id else {
            return Ok(());
        };

        let token = self.access_token()?;
        match self.guard(self.api.delete_entry(&token, id).await) {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::warn!(%error, server_id = %id, "remote delete failed; local removal stands");
                Err(error)
            }
        }
    }

    /// Return the full entry body for `server_id`.
    ///
    /// Serves from the detail cache unless `force_refresh` is set; a forced
    /// fetch bypasses the cache read but still writes through afterward.
    pub async fn fetch_detail(&self, server_id: ServerId, force_refresh: bool) -> Result<Entry> {
        if !force_refresh {
            if let Some(entry) = self.cache.get(server_id) {
                return Ok(entry);
            }
        }

        let token = self.access_token()?;
        self.fetch_remote_detail(&token, server_id, false).await
    }

    /// Fetch the authoritative detail record, preserving any local identity
    /// and edited flag already known for that server id, and write it
    /// through to the cache.
    async fn fetch_remote_detail(
        &self,
        token: &str,
        server_id: ServerId,
        mark_edited: bool,
    ) -> Result<Entry> {
        let record = self.guard(self.api.fetch_entry(token, server_id).await)?;
        let known = self
            .store
            .load_all()
            .into_iter()
            .find(|entry| entry.server_id() == Some(server_id));
        let (id, edited) = known.map_or((EntryId::synced(server_id), false), |entry| {
            (entry.id, entry.edited)
        });

        let entry = record.into_entry_as(id, edited || mark_edited);
        if let Err(error) = self.cache.put(server_id, &entry) {
            tracing::warn!(%error, %server_id, "detail record not cached");
        }
        Ok(entry)
    }

    fn access_token(&self) -> Result<String> {
        self.sessions
            .load()?
            .map(|session| session.access_token)
            .ok_or(Error::Unauthorized)
    }

    /// Funnel for remote results: a rejected credential tears the session
    /// down before the error propagates.
    fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(Error::Unauthorized)) {
            self.teardown_session();
        }
        result
    }

    fn teardown_session(&self) {
        if let Err(error) = self.sessions.clear() {
            tracing::warn!(%error, "failed to clear rejected session");
        }
        self.bus.publish(JournalEvent::SessionInvalidated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EntryPage, EntryRecord};
    use crate::session::MemorySessionStore;
    use crate::store::{BlobStore, MemoryBlobStore};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeState {
        entries: Vec<EntryRecord>,
        next_id: i64,
        next_image_id: i64,
        fail_next: Option<Error>,
        list_calls: usize,
        detail_calls: usize,
        delete_calls: usize,
    }

    /// In-memory stand-in for the journal server.
    #[derive(Default)]
    struct FakeApi {
        state: StdMutex<FakeState>,
    }

    impl FakeApi {
        fn with_entries(entries: Vec<EntryRecord>) -> Self {
            let next_id = entries.iter().map(|record| record.id).max().unwrap_or(0) + 1;
            Self {
                state: StdMutex::new(FakeState {
                    entries,
                    next_id,
                    next_image_id: 100,
                    ..FakeState::default()
                }),
            }
        }

        fn fail_next(&self, error: Error) {
            self.state.lock().unwrap().fail_next = Some(error);
        }

        fn detail_calls(&self) -> usize {
            self.state.lock().unwrap().detail_calls
        }

        fn delete_calls(&self) -> usize {
            self.state.lock().unwrap().delete_calls
        }

        fn remote_ids(&self) -> Vec<i64> {
            self.state
                .lock()
                .unwrap()
                .entries
                .iter()
                .map(|record| record.id)
                .collect()
        }
    }

    #[async_trait]
    impl JournalApi for FakeApi {
        async fn list_entries(
            &self,
            _access_token: &str,
            limit: usize,
            offset: usize,
        ) -> Result<EntryPage> {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.fail_next.take() {
                return Err(error);
            }
            state.list_calls += 1;
            let entries: Vec<EntryRecord> = state
                .entries
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect();
            let total = i64::try_from(state.entries.len()).unwrap();
            Ok(EntryPage { entries, total })
        }

        async fn create_entry(
            &self,
            _access_token: &str,
            request: &CreateEntryRequest,
        ) -> Result<EntryRecord> {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.fail_next.take() {
                return Err(error);
            }
            let id = state.next_id;
            state.next_id += 1;

            let mut record = EntryRecord {
                id,
                content: Some(request.content.clone()),
                emotion: Some(request.emotion.clone()),
                created_at: Some(1_700_000_000_000),
                ..EntryRecord::default()
            };
            for _ in &request.add_image_data {
                let image_id = state.next_image_id;
                state.next_image_id += 1;
                record.image_ids.push(image_id.to_string());
                record
                    .image_urls
                    .push(format!("https://cdn.example.com/{image_id}.jpg"));
            }
            state.entries.insert(0, record.clone());
            Ok(record)
        }

        async fn update_entry(
            &self,
            _access_token: &str,
            server_id: ServerId,
            request: &UpdateEntryRequest,
        ) -> Result<Vec<String>> {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.fail_next.take() {
                return Err(error);
            }
            let next_image_id = &mut state.next_image_id;
            let mut assigned = Vec::new();
            for _ in &request.add_image_data {
                assigned.push(*next_image_id);
                *next_image_id += 1;
            }

            let record = state
                .entries
                .iter_mut()
                .find(|record| record.id == server_id.as_i64())
                .ok_or_else(|| Error::NotFound(server_id.to_string()))?;

            let mut updated = Vec::new();
            if let Some(content) = &request.content {
                record.content = Some(content.clone());
                updated.push("content".to_string());
            }
            if let Some(emotion) = &request.emotion {
                record.emotion = Some(emotion.clone());
                updated.push("emotion".to_string());
            }

            let kept: Vec<(String, String)> = record
                .image_ids
                .iter()
                .zip(record.image_urls.iter())
                .filter(|(id, _)| {
                    id.parse::<i64>()
                        .is_ok_and(|id| request.keep_image_ids.contains(&id))
                })
                .map(|(id, url)| (id.clone(), url.clone()))
                .collect();
            record.image_ids = kept.iter().map(|(id, _)| id.clone()).collect();
            record.image_urls = kept.into_iter().map(|(_, url)| url).collect();
            for image_id in assigned {
                record.image_ids.push(image_id.to_string());
                record
                    .image_urls
                    .push(format!("https://cdn.example.com/{image_id}.jpg"));
            }
            updated.push("images".to_string());
            Ok(updated)
        }

        async fn delete_entry(&self, _access_token: &str, server_id: ServerId) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.fail_next.take() {
                return Err(error);
            }
            state.delete_calls += 1;
            let before = state.entries.len();
            state
                .entries
                .retain(|record| record.id != server_id.as_i64());
            if state.entries.len() == before {
                return Err(Error::NotFound(server_id.to_string()));
            }
            Ok(())
        }

        async fn fetch_entry(
            &self,
            _access_token: &str,
            server_id: ServerId,
        ) -> Result<EntryRecord> {
            let mut state = self.state.lock().unwrap();
            if let Some(error) = state.fail_next.take() {
                return Err(error);
            }
            state.detail_calls += 1;
            state
                .entries
                .iter()
                .find(|record| record.id == server_id.as_i64())
                .cloned()
                .ok_or_else(|| Error::NotFound(server_id.to_string()))
        }
    }

    struct Harness {
        api: Arc<FakeApi>,
        sessions: Arc<MemorySessionStore>,
        coordinator: SyncCoordinator,
    }

    fn harness(api: FakeApi) -> Harness {
        let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let api = Arc::new(api);
        let sessions = Arc::new(MemorySessionStore::with_token("token"));
        let coordinator = SyncCoordinator::new(
            api.clone(),
            EntryStore::new(blobs.clone()),
            DetailCache::new(blobs),
            sessions.clone(),
            EventBus::default(),
        );
        Harness {
            api,
            sessions,
            coordinator,
        }
    }

    fn remote_record(id: i64, content: &str) -> EntryRecord {
        EntryRecord {
            id,
            content: Some(content.to_string()),
            emotion: Some("calm".to_string()),
            created_at: Some(1_700_000_000_000),
            ..EntryRecord::default()
        }
    }

    #[tokio::test]
    async fn refresh_list_mirrors_the_fetched_page() {
        let h = harness(FakeApi::with_entries(vec![
            remote_record(2, "second"),
            remote_record(1, "first"),
        ]));

        let fetched = h.coordinator.refresh_list(20, 0).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].server_id(), Some(ServerId::new(2)));

        let mirrored = h.coordinator.store().load_all();
        assert_eq!(mirrored, fetched);
    }

    #[tokio::test]
    async fn refresh_list_preserves_pending_entries_and_local_ids() {
        let h = harness(FakeApi::with_entries(vec![remote_record(1, "first")]));

        let first = h.coordinator.refresh_list(20, 0).await.unwrap();
        let known_local = first[0].local_id();

        let pending = Entry::new_pending("offline draft", Emotion::Anxious);
        let mut all = h.coordinator.store().load_all();
        all.insert(0, pending.clone());
        h.coordinator.store().save_all(&all).unwrap();

        let second = h.coordinator.refresh_list(20, 0).await.unwrap();
        // The re-fetched entry keeps the local identity it had before.
        assert_eq!(second[0].local_id(), known_local);

        let mirrored = h.coordinator.store().load_all();
        assert!(mirrored
            .iter()
            .any(|entry| entry.local_id() == pending.local_id()));
        assert!(mirrored
            .iter()
            .any(|entry| entry.server_id() == Some(ServerId::new(1))));
    }

    #[tokio::test]
    async fn create_populates_store_and_detail_cache() {
        let h = harness(FakeApi::with_entries(Vec::new()));
        let mut rx = h.coordinator.bus().subscribe();

        let entry = h
            .coordinator
            .create_entry("today was fine", Emotion::Happy, Vec::new())
            .await
            .unwrap();

        let server_id = entry.server_id().expect("created entry is synced");
        assert_eq!(entry.content, "today was fine");
        assert_eq!(entry.emotion, Emotion::Happy);

        // Already mirrored locally when the call returns.
        let mirrored = h.coordinator.store().load_all();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].server_id(), Some(server_id));

        // Detail view is served from cache, no second network call.
        let detail = h.coordinator.fetch_detail(server_id, false).await.unwrap();
        assert_eq!(detail.content, "today was fine");
        assert_eq!(h.api.detail_calls(), 0);

        assert_eq!(rx.recv().await.unwrap(), JournalEvent::EntryUpdated { server_id });
    }

    #[tokio::test]
    async fn create_sends_attachment_payloads_and_receives_server_ids() {
        let h = harness(FakeApi::with_entries(Vec::new()));

        let entry = h
            .coordinator
            .create_entry("with photo", Emotion::Calm, vec!["aGVsbG8=".to_string()])
            .await
            .unwrap();

        assert_eq!(entry.attachments.len(), 1);
        assert!(entry.attachments[0].is_existing());
    }

    #[tokio::test]
    async fn update_refreshes_cache_and_store_before_broadcasting() {
        let h = harness(FakeApi::with_entries(vec![remote_record(42, "original")]));
        h.coordinator.refresh_list(20, 0).await.unwrap();
        let original_local = h.coordinator.store().load_all()[0].local_id();

        // Stale detail record sitting in the cache from an earlier view.
        h.coordinator.fetch_detail(ServerId::new(42), false).await.unwrap();

        let mut rx = h.coordinator.bus().subscribe();
        let entry = h
            .coordinator
            .update_entry(
                ServerId::new(42),
                EntryChanges {
                    content: Some("revised".to_string()),
                    ..EntryChanges::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(entry.content, "revised");
        assert!(entry.edited);
        assert_eq!(entry.local_id(), original_local);

        // A subscriber reacting to the broadcast sees only fresh state.
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            JournalEvent::EntryUpdated {
                server_id: ServerId::new(42)
            }
        );
        let cached = h.coordinator.cache().get(ServerId::new(42)).unwrap();
        assert_eq!(cached.content, "revised");
        let mirrored = h.coordinator.store().load_all();
        assert_eq!(mirrored[0].content, "revised");
    }

    #[tokio::test]
    async fn delete_removes_locally_and_remotely() {
        let h = harness(FakeApi::with_entries(vec![remote_record(42, "doomed")]));
        let fetched = h.coordinator.refresh_list(20, 0).await.unwrap();
        h.coordinator.fetch_detail(ServerId::new(42), false).await.unwrap();

        let mut rx = h.coordinator.bus().subscribe();
        h.coordinator.delete_entry(&fetched[0]).await.unwrap();

        assert!(h.coordinator.store().load_all().is_empty());
        assert!(h.coordinator.cache().get(ServerId::new(42)).is_none());
        assert_eq!(h.api.remote_ids(), Vec::<i64>::new());
        assert_eq!(
            rx.recv().await.unwrap(),
            JournalEvent::EntryDeleted {
                server_id: Some(ServerId::new(42))
            }
        );
    }

    #[tokio::test]
    async fn failed_remote_delete_keeps_local_removal() {
        let h = harness(FakeApi::with_entries(vec![remote_record(42, "doomed")]));
        let fetched = h.coordinator.refresh_list(20, 0).await.unwrap();

        h.api.fail_next(Error::Timeout);
        let error = h.coordinator.delete_entry(&fetched[0]).await.unwrap_err();
        assert!(error.is_retryable());

        // Optimistic removal is not rolled back.
        assert!(h.coordinator.store().load_all().is_empty());
        // The server still has the entry; the next refresh resurfaces it.
        assert_eq!(h.api.remote_ids(), vec![42]);
    }

    #[tokio::test]
    async fn deleting_a_pending_entry_never_calls_the_server() {
        let h = harness(FakeApi::with_entries(Vec::new()));
        let pending = Entry::new_pending("never synced", Emotion::Sad);
        h.coordinator.store().save_all(&[pending.clone()]).unwrap();

        let mut rx = h.coordinator.bus().subscribe();
        h.coordinator.delete_entry(&pending).await.unwrap();

        assert!(h.coordinator.store().load_all().is_empty());
        assert_eq!(h.api.delete_calls(), 0);
        assert_eq!(
            rx.recv().await.unwrap(),
            JournalEvent::EntryDeleted { server_id: None }
        );
    }

    #[tokio::test]
    async fn detail_fetch_populates_cache_and_force_refresh_bypasses_it() {
        let h = harness(FakeApi::with_entries(vec![remote_record(7, "body")]));

        let first = h.coordinator.fetch_detail(ServerId::new(7), false).await.unwrap();
        assert_eq!(first.content, "body");
        assert_eq!(h.api.detail_calls(), 1);

        // Cache hit: no extra call.
        h.coordinator.fetch_detail(ServerId::new(7), false).await.unwrap();
        assert_eq!(h.api.detail_calls(), 1);

        // Forced: bypasses the cache read but writes through again.
        h.coordinator.fetch_detail(ServerId::new(7), true).await.unwrap();
        assert_eq!(h.api.detail_calls(), 2);
        assert!(h.coordinator.cache().get(ServerId::new(7)).is_some());
    }

    #[tokio::test]
    async fn unauthorized_mutation_tears_down_the_session() {
        let h = harness(FakeApi::with_entries(vec![remote_record(42, "original")]));
        h.coordinator.refresh_list(20, 0).await.unwrap();

        let mut rx = h.coordinator.bus().subscribe();
        h.api.fail_next(Error::Unauthorized);
        let error = h
            .coordinator
            .update_entry(
                ServerId::new(42),
                EntryChanges {
                    content: Some("revised".to_string()),
                    ..EntryChanges::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Unauthorized));
        assert!(h.sessions.load().unwrap().is_none());
        assert_eq!(rx.recv().await.unwrap(), JournalEvent::SessionInvalidated);
        // No partial local mutation was retained as valid state.
        assert_eq!(h.coordinator.store().load_all()[0].content, "original");
    }

    #[tokio::test]
    async fn operations_without_a_session_fail_unauthorized() {
        let h = harness(FakeApi::with_entries(Vec::new()));
        h.sessions.clear().unwrap();

        let error = h.coordinator.refresh_list(20, 0).await.unwrap_err();
        assert!(matches!(error, Error::Unauthorized));
    }

    #[tokio::test]
    async fn retryable_refresh_failure_leaves_mirror_untouched() {
        let h = harness(FakeApi::with_entries(vec![remote_record(1, "kept")]));
        h.coordinator.refresh_list(20, 0).await.unwrap();

        h.api.fail_next(Error::Network("connection reset".to_string()));
        let error = h.coordinator.refresh_list(20, 0).await.unwrap_err();
        assert!(error.is_retryable());
        assert_eq!(h.coordinator.store().load_all().len(), 1);
    }
}
