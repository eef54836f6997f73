//! Write-behind auxiliary cache
//!
//! `WriteBehindCache` puts every update into a staging area (purgatory) and
//! queues it for persistence. Reads consult the staging area first, so a
//! caller always sees its own write, and fall through to the backing store
//! on a miss.
//!
//! Element lifecycle:
//!
//! ```text
//! update ──► staged (spoolable) ──► persisted ──► dropped from staging
//!                 │
//!                 ├── remove ──► cancelled (non-spoolable, dropped)
//!                 ├── removeAll ──► swapped out (stale generation)
//!                 └── evicted (bounded staging) ──► spill slot ──► persisted by the evicting update
//! ```
//!
//! Every persist and every remove of a key runs under that key's lock, so a
//! remove is never overtaken by a persist that started before it.
//!
//! Backing store failures never reach callers of `get` or `update`. A failed
//! fetch or enqueue destroys the persistence queue instead; the tier keeps
//! serving reads until it is disposed.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::barrier::InvalidationBarrier;
use super::config::SpoolSettings;
use super::drain::{wait_for_drain, DrainOutcome};
use super::element::CacheElement;
use super::error::CacheError;
use super::events::{CacheEventKind, EventLogger, EventScope};
use super::key_lock::KeyLocks;
use super::matcher::KeyMatcher;
use super::queue::{JobHandler, PersistenceQueue};
use super::staging::{StagedEntry, StagingArea};
use super::stats::{CacheStatus, SpoolStats};
use super::store::{BackingStore, StoreError};
use super::traits::AuxiliaryCache;

const EVENT_SOURCE: &str = "write_behind";

/// How an entry reached the persist critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpoolPath {
    /// Taken off the persistence queue
    Queued,
    /// Pushed out of a full staging area by a newer update
    Evicted,
}

/// State shared between the façade and the queue consumer
struct SpoolCore<S> {
    settings: SpoolSettings,
    store: S,
    staging: StagingArea,
    barrier: InvalidationBarrier,
    key_locks: KeyLocks,
    alive: AtomicBool,
    purgatory_hits: AtomicU64,
    event_logger: Option<Arc<dyn EventLogger>>,
}

impl<S: BackingStore> SpoolCore<S> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn cache_name(&self) -> &str {
        &self.settings.cache_name
    }

    fn log_error(&self, kind: CacheEventKind, message: &str) {
        if let Some(logger) = &self.event_logger {
            logger.log_error(EVENT_SOURCE, kind, message);
        }
    }

    /// Persist one staged entry if it is still eligible
    ///
    /// Runs under the key lock and the shared side of the barrier, so a
    /// concurrent remove waits for it and a removeAll cannot swap staging
    /// halfway through. Returns whether the store was written.
    async fn spool(&self, entry: &Arc<StagedEntry>, path: SpoolPath) -> Result<bool, StoreError> {
        let _key_guard = self.key_locks.lock(entry.key()).await;
        let barrier = self.barrier.enter().await;

        if !self.is_alive() {
            return Ok(false);
        }

        let still_current = match path {
            SpoolPath::Queued => self.staging.contains_entry(entry),
            SpoolPath::Evicted => self.staging.is_pending_spill(entry),
        };
        if !still_current || !entry.is_spoolable() || !barrier.admits(entry.generation()) {
            tracing::debug!(
                cache_name = %self.cache_name(),
                key = %entry.key(),
                "Skipping persist: entry was cancelled, superseded or invalidated"
            );
            return Ok(false);
        }

        self.store.persist(entry.element().clone()).await?;
        entry.set_spoolable(false);
        drop(barrier);

        match path {
            SpoolPath::Queued => {
                self.staging.remove_entry(entry);
            }
            SpoolPath::Evicted => self.staging.finish_spill(entry),
        }
        Ok(true)
    }

    /// Staging first, then the backing store
    ///
    /// Returns Err only when the store fetch failed; the caller decides how
    /// to degrade.
    async fn resolve(&self, key: &str) -> Result<Option<CacheElement>, StoreError> {
        if let Some(entry) = self.staging.get(key) {
            let hits = self.purgatory_hits.fetch_add(1, Ordering::Relaxed) + 1;
            if hits % 100 == 0 {
                tracing::debug!(cache_name = %self.cache_name(), purgatory_hits = hits, "Purgatory hits");
            }
            tracing::trace!(cache_name = %self.cache_name(), key = %key, "Found element in purgatory");
            return Ok(Some(entry.element().clone()));
        }
        self.store.fetch(key).await
    }
}

#[async_trait]
impl<S> JobHandler<Arc<StagedEntry>> for SpoolCore<S>
where
    S: BackingStore + 'static,
{
    async fn handle(&self, entry: &Arc<StagedEntry>) -> Result<(), CacheError> {
        match self.spool(entry, SpoolPath::Queued).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    cache_name = %self.cache_name(),
                    key = %entry.key(),
                    error = %e,
                    "Failed to persist staged element"
                );
                self.log_error(CacheEventKind::Update, &e.to_string());
                Err(e.into())
            }
        }
    }
}

/// Write-behind tier over any backing store
pub struct WriteBehindCache<S: BackingStore + 'static> {
    core: Arc<SpoolCore<S>>,
    queue: Arc<PersistenceQueue<Arc<StagedEntry>>>,
    disposed: AtomicBool,
}

impl<S: BackingStore + 'static> WriteBehindCache<S> {
    /// Build a tier without event logging; must be called inside a tokio runtime
    pub fn new(settings: SpoolSettings, store: S) -> Self {
        Self::build(settings, store, None)
    }

    /// Build a tier that reports every operation to `event_logger`
    pub fn with_event_logger(
        settings: SpoolSettings,
        store: S,
        event_logger: Arc<dyn EventLogger>,
    ) -> Self {
        Self::build(settings, store, Some(event_logger))
    }

    fn build(settings: SpoolSettings, store: S, event_logger: Option<Arc<dyn EventLogger>>) -> Self {
        let staging = StagingArea::new(settings.max_purgatory_size);
        let queue_settings = settings.queue.clone();

        let core = Arc::new(SpoolCore {
            settings,
            store,
            staging,
            barrier: InvalidationBarrier::new(),
            key_locks: KeyLocks::new(),
            alive: AtomicBool::new(false),
            purgatory_hits: AtomicU64::new(0),
            event_logger,
        });

        let queue = Arc::new(PersistenceQueue::start(
            core.settings.cache_name.clone(),
            core.clone(),
            queue_settings,
        ));

        core.alive.store(true, Ordering::SeqCst);
        tracing::info!(
            cache_name = %core.cache_name(),
            location = %core.store.location(),
            max_purgatory_size = core.settings.max_purgatory_size,
            "Write-behind cache initialized"
        );

        Self {
            core,
            queue,
            disposed: AtomicBool::new(false),
        }
    }

    /// The backing store behind this tier
    pub fn store(&self) -> &S {
        &self.core.store
    }

    pub fn is_alive(&self) -> bool {
        self.core.is_alive()
    }

    /// True when no persist job is queued or in flight
    pub fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn event(&self, kind: CacheEventKind, key: Option<&str>) -> EventScope<'_> {
        EventScope::begin(
            self.core.event_logger.as_deref(),
            EVENT_SOURCE,
            self.core.cache_name(),
            kind,
            key,
            || self.core.store.location(),
        )
    }

    /// Fail-stop: a broken store or queue takes the write-behind path down
    fn destroy_queue(&self, kind: CacheEventKind, error: &dyn std::fmt::Display) {
        tracing::error!(
            cache_name = %self.core.cache_name(),
            operation = %kind,
            error = %error,
            "Destroying persistence queue"
        );
        self.core.log_error(kind, &error.to_string());
        self.queue.destroy();
    }

    async fn resolve_or_degrade(&self, key: &str, kind: CacheEventKind) -> Option<CacheElement> {
        match self.core.resolve(key).await {
            Ok(element) => element,
            Err(e) => {
                self.destroy_queue(kind, &e);
                None
            }
        }
    }

    async fn remove_from_store(&self, key: &str) -> Result<bool, CacheError> {
        self.core.store.remove(key).await.map_err(|e| {
            tracing::error!(cache_name = %self.core.cache_name(), key = %key, error = %e, "Physical remove failed");
            self.core.log_error(CacheEventKind::Remove, &e.to_string());
            CacheError::from(e)
        })
    }
}

#[async_trait]
impl<S: BackingStore + 'static> AuxiliaryCache for WriteBehindCache<S> {
    async fn get(&self, key: &str) -> Option<CacheElement> {
        let _event = self.event(CacheEventKind::Get, Some(key));
        if !self.core.is_alive() {
            tracing::debug!(cache_name = %self.core.cache_name(), "get was called, but the cache is not alive");
            return None;
        }
        self.resolve_or_degrade(key, CacheEventKind::Get).await
    }

    async fn get_multiple(&self, keys: &HashSet<String>) -> HashMap<String, CacheElement> {
        let _event = self.event(CacheEventKind::GetMultiple, None);
        if !self.core.is_alive() {
            return HashMap::new();
        }

        let lookups = keys.iter().map(|key| async move {
            let element = self.resolve_or_degrade(key, CacheEventKind::GetMultiple).await;
            (key, element)
        });
        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(key, element)| element.map(|element| (key.clone(), element)))
            .collect()
    }

    async fn get_matching(&self, pattern: &str) -> Result<HashMap<String, CacheElement>, CacheError> {
        let _event = self.event(CacheEventKind::GetMatching, Some(pattern));
        let matcher = KeyMatcher::new(pattern)?;
        if !self.core.is_alive() {
            return Ok(HashMap::new());
        }

        let staged_keys = matcher.matching_keys(&self.core.staging.keys());

        // Store matches go in first so staged writes shadow them, as in get
        let mut result = match self.core.store.fetch_matching(pattern).await {
            Ok(matches) => matches,
            Err(e) => {
                self.destroy_queue(CacheEventKind::GetMatching, &e);
                HashMap::new()
            }
        };
        for key in staged_keys {
            if let Some(element) = self.resolve_or_degrade(&key, CacheEventKind::GetMatching).await {
                result.insert(key, element);
            }
        }
        Ok(result)
    }

    async fn update(&self, element: CacheElement) {
        let _event = self.event(CacheEventKind::Update, Some(&element.key));
        if !self.core.is_alive() {
            tracing::debug!(cache_name = %self.core.cache_name(), key = %element.key, "update was called, but the cache is not alive");
            return;
        }
        if !element.attributes.is_spool {
            tracing::debug!(cache_name = %self.core.cache_name(), key = %element.key, "Element is not allowed to spool");
            return;
        }

        tracing::debug!(cache_name = %self.core.cache_name(), key = %element.key, "Putting element in purgatory");
        let (entry, evicted) = {
            let barrier = self.core.barrier.enter().await;
            let entry = Arc::new(StagedEntry::new(element, barrier.generation()));
            let evicted = self.core.staging.insert(entry.clone());
            (entry, evicted)
        };

        if let Err(e) = self.queue.enqueue(entry) {
            self.destroy_queue(CacheEventKind::Update, &e);
        }

        if let Some(evicted) = evicted {
            tracing::debug!(
                cache_name = %self.core.cache_name(),
                key = %evicted.key(),
                "Purgatory full, persisting evicted element"
            );
            match self.core.spool(&evicted, SpoolPath::Evicted).await {
                Ok(_) => self.core.staging.finish_spill(&evicted),
                // Stays readable from the spill slot, like a staged write
                Err(e) => self.destroy_queue(CacheEventKind::Update, &e),
            }
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let _event = self.event(CacheEventKind::Remove, Some(key));
        if !self.core.is_alive() {
            return Ok(false);
        }

        // Queued jobs and pending spills for the key now skip
        let was_staged = self.core.staging.cancel(key);

        // Waits out any persist of the key that already passed its checks
        let _key_guard = self.core.key_locks.lock(key).await;
        let removed_from_store = self.remove_from_store(key).await?;
        Ok(was_staged || removed_from_store)
    }

    async fn remove_all(&self) -> Result<(), CacheError> {
        let _event = self.event(CacheEventKind::RemoveAll, None);
        if !self.core.settings.allow_remove_all {
            tracing::info!(
                cache_name = %self.core.cache_name(),
                "RemoveAll was requested but not fulfilled: allow_remove_all is false"
            );
            return Ok(());
        }

        let mut dropped = 0;
        let generation = self
            .core
            .barrier
            .invalidate(|| dropped = self.core.staging.reset())
            .await;
        tracing::info!(
            cache_name = %self.core.cache_name(),
            dropped = dropped,
            generation = generation,
            "Purgatory cleared"
        );

        self.core.store.remove_all().await.map_err(|e| {
            tracing::error!(cache_name = %self.core.cache_name(), error = %e, "Physical removeAll failed");
            self.core.log_error(CacheEventKind::RemoveAll, &e.to_string());
            CacheError::from(e)
        })
    }

    async fn dispose(&self) -> Result<(), CacheError> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            tracing::debug!(cache_name = %self.core.cache_name(), "dispose was called on a disposed cache");
            return Ok(());
        }
        let _event = self.event(CacheEventKind::Dispose, None);

        let limit = self.core.settings.shutdown_spool_time_limit;
        tracing::info!(
            cache_name = %self.core.cache_name(),
            limit_ms = limit.as_millis() as u64,
            pending = self.queue.stats().pending,
            "Disposing, waiting for persistence queue to drain"
        );

        let queue = self.queue.clone();
        let outcome = wait_for_drain(
            move || queue.is_empty(),
            limit,
            self.core.settings.drain_poll_interval,
        )
        .await;
        let stats = self.queue.stats();
        match outcome {
            DrainOutcome::Drained => tracing::info!(
                cache_name = %self.core.cache_name(),
                processed = stats.processed,
                "Persistence queue drained"
            ),
            DrainOutcome::TimedOut => tracing::info!(
                cache_name = %self.core.cache_name(),
                abandoned = stats.pending,
                processed = stats.processed,
                "No longer waiting for persistence queue to finish"
            ),
        }

        self.queue.destroy();
        let shutdown = self.core.store.shutdown().await;
        self.core.alive.store(false, Ordering::SeqCst);

        shutdown.map_err(|e| {
            tracing::error!(cache_name = %self.core.cache_name(), error = %e, "Backing store shutdown failed");
            self.core.log_error(CacheEventKind::Dispose, &e.to_string());
            CacheError::from(e)
        })
    }

    async fn get_key_set(&self) -> Result<HashSet<String>, CacheError> {
        let mut keys = self.core.store.key_set().await?;
        keys.extend(self.core.staging.keys());
        Ok(keys)
    }

    async fn get_size(&self) -> Result<usize, CacheError> {
        Ok(self.core.store.current_size().await?)
    }

    fn get_statistics(&self) -> SpoolStats {
        SpoolStats {
            cache_name: self.core.cache_name().to_string(),
            status: self.get_status(),
            purgatory_hits: self.core.purgatory_hits.load(Ordering::Relaxed),
            purgatory_size: self.core.staging.len(),
            purgatory_capacity: self.core.staging.capacity(),
            generation: self.core.barrier.try_generation(),
            queue: self.queue.stats(),
        }
    }

    fn get_status(&self) -> CacheStatus {
        if !self.core.is_alive() {
            CacheStatus::Disposed
        } else if !self.queue.is_working() {
            CacheStatus::Error
        } else {
            CacheStatus::Alive
        }
    }

    fn get_cache_name(&self) -> &str {
        self.core.cache_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::events::tests::CollectingLogger;
    use crate::cache::store::MemoryStore;
    use bytes::Bytes;
    use std::time::{Duration, Instant};

    fn element(key: &str, value: &str) -> CacheElement {
        CacheElement::new("test", key, value.to_string())
    }

    fn tier(store: &MemoryStore) -> WriteBehindCache<MemoryStore> {
        WriteBehindCache::new(SpoolSettings::named("test"), store.clone())
    }

    async fn drain(cache: &WriteBehindCache<MemoryStore>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cache.is_queue_empty() {
            assert!(Instant::now() < deadline, "queue did not drain");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_new_cache_is_alive() {
        let cache = tier(&MemoryStore::new());
        assert!(cache.is_alive());
        assert_eq!(cache.get_status(), CacheStatus::Alive);
        assert_eq!(cache.get_cache_name(), "test");
    }

    #[tokio::test]
    async fn test_get_of_unknown_key_misses() {
        let cache = tier(&MemoryStore::new());
        assert!(cache.get("never-written").await.is_none());
    }

    #[tokio::test]
    async fn test_update_is_readable_before_persist() {
        let store = MemoryStore::new();
        store.set_persist_delay(Some(Duration::from_millis(200)));
        let cache = tier(&store);

        cache.update(element("k", "v")).await;
        assert_eq!(cache.get("k").await.unwrap().value, Bytes::from("v"));
        assert!(store.peek("k").is_none());
        assert_eq!(cache.get_statistics().purgatory_hits, 1);
    }

    #[tokio::test]
    async fn test_persisted_element_leaves_staging() {
        let store = MemoryStore::new();
        let cache = tier(&store);

        cache.update(element("k", "v")).await;
        drain(&cache).await;

        assert_eq!(cache.get_statistics().purgatory_size, 0);
        assert_eq!(store.peek("k").unwrap().value, Bytes::from("v"));
        assert_eq!(cache.get("k").await.unwrap().value, Bytes::from("v"));
        assert_eq!(cache.get_statistics().purgatory_hits, 0);
    }

    #[tokio::test]
    async fn test_non_spool_element_is_ignored() {
        let store = MemoryStore::new();
        let cache = tier(&store);

        let mut local_only = element("k", "v");
        local_only.attributes.is_spool = false;
        cache.update(local_only).await;

        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.get_statistics().queue.processed, 0);
    }

    #[tokio::test]
    async fn test_remove_cancels_staged_write() {
        let store = MemoryStore::new();
        store.set_persist_delay(Some(Duration::from_millis(50)));
        let cache = tier(&store);

        cache.update(element("first", "1")).await;
        cache.update(element("k", "v")).await;
        assert!(cache.remove("k").await.unwrap());
        drain(&cache).await;

        assert!(cache.get("k").await.is_none());
        assert!(store.peek("k").is_none());
        assert!(store.peek("first").is_some());
    }

    #[tokio::test]
    async fn test_remove_reaches_persisted_element() {
        let store = MemoryStore::new();
        let cache = tier(&store);

        cache.update(element("k", "v")).await;
        drain(&cache).await;

        assert!(cache.remove("k").await.unwrap());
        assert!(!cache.remove("k").await.unwrap());
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_newer_write_supersedes_queued_one() {
        let store = MemoryStore::new();
        store.set_persist_delay(Some(Duration::from_millis(20)));
        let cache = tier(&store);

        cache.update(element("k", "old")).await;
        cache.update(element("k", "new")).await;
        drain(&cache).await;

        assert_eq!(store.peek("k").unwrap().value, Bytes::from("new"));
        assert_eq!(cache.get("k").await.unwrap().value, Bytes::from("new"));
    }

    #[tokio::test]
    async fn test_remove_all_clears_staging_and_store() {
        let store = MemoryStore::new();
        store.seed(element("persisted", "p"));
        store.set_persist_delay(Some(Duration::from_millis(100)));
        let cache = tier(&store);

        cache.update(element("staged", "s")).await;
        cache.remove_all().await.unwrap();
        drain(&cache).await;

        assert!(cache.get("staged").await.is_none());
        assert!(cache.get("persisted").await.is_none());
        assert!(store.is_empty());
        assert_eq!(cache.get_statistics().generation, Some(1));
    }

    #[tokio::test]
    async fn test_remove_all_disabled_is_a_no_op() {
        let store = MemoryStore::new();
        store.seed(element("persisted", "p"));
        let settings = SpoolSettings {
            allow_remove_all: false,
            ..SpoolSettings::named("test")
        };
        let cache = WriteBehindCache::new(settings, store.clone());

        cache.remove_all().await.unwrap();
        assert!(cache.get("persisted").await.is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_misses_and_destroys_queue() {
        let store = MemoryStore::new();
        store.seed(element("k", "v"));
        store.set_fail_fetch(true);
        let logger = Arc::new(CollectingLogger::default());
        let cache =
            WriteBehindCache::with_event_logger(SpoolSettings::named("test"), store.clone(), logger.clone());

        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.get_status(), CacheStatus::Error);
        assert!(cache.is_alive());
        assert_eq!(logger.errors.lock()[0].0, CacheEventKind::Get);

        // Staged writes stay readable, they just never reach the store
        cache.update(element("later", "x")).await;
        assert!(cache.get("later").await.is_some());
        assert!(store.peek("later").is_none());
    }

    #[tokio::test]
    async fn test_persist_failure_stops_queue() {
        let store = MemoryStore::new();
        store.set_fail_persist(true);
        let cache = tier(&store);

        cache.update(element("k", "v")).await;
        drain(&cache).await;

        assert_eq!(cache.get_status(), CacheStatus::Error);
        assert_eq!(cache.get_statistics().queue.failures, 1);
        // Still served from staging
        assert_eq!(cache.get("k").await.unwrap().value, Bytes::from("v"));
    }

    #[tokio::test]
    async fn test_get_multiple_only_returns_resolved_keys() {
        let store = MemoryStore::new();
        store.seed(element("persisted", "p"));
        let cache = tier(&store);
        cache.update(element("staged", "s")).await;

        let keys: HashSet<String> = ["persisted", "staged", "missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found = cache.get_multiple(&keys).await;

        assert_eq!(found.len(), 2);
        assert!(found.contains_key("persisted"));
        assert!(found.contains_key("staged"));
    }

    #[tokio::test]
    async fn test_get_matching_staging_shadows_store() {
        let store = MemoryStore::new();
        store.seed(element("user:1", "stale"));
        store.seed(element("user:2", "two"));
        store.set_persist_delay(Some(Duration::from_millis(200)));
        let cache = tier(&store);

        cache.update(element("user:1", "fresh")).await;
        let matched = cache.get_matching("user:\\d").await.unwrap();

        assert_eq!(matched.len(), 2);
        assert_eq!(matched["user:1"].value, Bytes::from("fresh"));
        assert_eq!(matched["user:1"], cache.get("user:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_matching_rejects_invalid_pattern() {
        let cache = tier(&MemoryStore::new());
        assert!(matches!(
            cache.get_matching("(").await,
            Err(CacheError::InvalidPattern(_))
        ));
    }

    #[tokio::test]
    async fn test_key_set_unions_staging_and_store() {
        let store = MemoryStore::new();
        store.seed(element("persisted", "p"));
        store.set_persist_delay(Some(Duration::from_millis(200)));
        let cache = tier(&store);
        cache.update(element("staged", "s")).await;

        let keys = cache.get_key_set().await.unwrap();
        assert!(keys.contains("persisted"));
        assert!(keys.contains("staged"));
        assert_eq!(cache.get_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dispose_drains_then_shuts_down() {
        let store = MemoryStore::new();
        let cache = tier(&store);
        cache.update(element("k", "v")).await;

        cache.dispose().await.unwrap();

        assert!(store.peek("k").is_some());
        assert!(store.is_shut_down());
        assert_eq!(cache.get_status(), CacheStatus::Disposed);
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_dispose_twice_is_a_no_op() {
        let logger = Arc::new(CollectingLogger::default());
        let cache = WriteBehindCache::with_event_logger(
            SpoolSettings::named("test"),
            MemoryStore::new(),
            logger.clone(),
        );

        cache.dispose().await.unwrap();
        cache.dispose().await.unwrap();
        assert_eq!(logger.kinds(), vec![CacheEventKind::Dispose]);
    }

    #[tokio::test]
    async fn test_update_after_dispose_is_dropped() {
        let store = MemoryStore::new();
        let cache = tier(&store);
        cache.dispose().await.unwrap();

        cache.update(element("k", "v")).await;
        assert_eq!(cache.get_statistics().purgatory_size, 0);
    }

    #[tokio::test]
    async fn test_every_operation_emits_an_event() {
        let logger = Arc::new(CollectingLogger::default());
        let cache = WriteBehindCache::with_event_logger(
            SpoolSettings::named("test"),
            MemoryStore::new(),
            logger.clone(),
        );

        cache.update(element("k", "v")).await;
        cache.get("k").await;
        cache.get_multiple(&HashSet::new()).await;
        cache.get_matching(".*").await.unwrap();
        cache.remove("k").await.unwrap();
        cache.remove_all().await.unwrap();
        cache.dispose().await.unwrap();

        assert_eq!(
            logger.kinds(),
            vec![
                CacheEventKind::Update,
                CacheEventKind::Get,
                CacheEventKind::GetMultiple,
                CacheEventKind::GetMatching,
                CacheEventKind::Remove,
                CacheEventKind::RemoveAll,
                CacheEventKind::Dispose,
            ]
        );
        let events = logger.events.lock();
        assert!(events.iter().all(|e| e.region == "test" && e.detail == "memory"));
    }
}
