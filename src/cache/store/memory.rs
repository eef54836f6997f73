//! In-memory backing store (HashMap storage with failure injection)

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::StoreError;
use super::BackingStore;
use crate::cache::element::CacheElement;
use crate::cache::matcher::KeyMatcher;

/// Backing store that keeps elements in memory
///
/// Clones share the same storage, so a test can keep a handle to inspect the
/// store after handing it to the tier.
#[derive(Clone, Default)]
pub struct MemoryStore {
    elements: Arc<RwLock<HashMap<String, CacheElement>>>,
    /// Artificial latency applied before each persist
    persist_delay: Arc<RwLock<Option<Duration>>>,
    /// Simulate errors if true
    fail_fetch: Arc<AtomicBool>,
    fail_persist: Arc<AtomicBool>,
    fail_remove: Arc<AtomicBool>,
    persist_count: Arc<AtomicU64>,
    shut_down: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every persist by `delay`
    pub fn set_persist_delay(&self, delay: Option<Duration>) {
        *self.persist_delay.write() = delay;
    }

    /// Enable fetch failure simulation for testing
    pub fn set_fail_fetch(&self, enabled: bool) {
        self.fail_fetch.store(enabled, Ordering::SeqCst);
    }

    /// Enable persist failure simulation for testing
    pub fn set_fail_persist(&self, enabled: bool) {
        self.fail_persist.store(enabled, Ordering::SeqCst);
    }

    /// Enable remove failure simulation for testing
    pub fn set_fail_remove(&self, enabled: bool) {
        self.fail_remove.store(enabled, Ordering::SeqCst);
    }

    /// Number of successful persist calls
    pub fn persist_count(&self) -> u64 {
        self.persist_count.load(Ordering::SeqCst)
    }

    /// Whether `shutdown` has been called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Read an element without going through the trait
    pub fn peek(&self, key: &str) -> Option<CacheElement> {
        self.elements.read().get(key).cloned()
    }

    /// Seed an element directly, bypassing the tier
    pub fn seed(&self, element: CacheElement) {
        self.elements.write().insert(element.key.clone(), element);
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    fn simulated_failure(flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("simulated {} failure", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Option<CacheElement>, StoreError> {
        Self::simulated_failure(&self.fail_fetch, "fetch")?;
        Ok(self.elements.read().get(key).cloned())
    }

    async fn fetch_matching(&self, pattern: &str) -> Result<HashMap<String, CacheElement>, StoreError> {
        Self::simulated_failure(&self.fail_fetch, "fetch")?;
        let matcher = KeyMatcher::new(pattern)?;
        let elements = self.elements.read();
        Ok(elements
            .iter()
            .filter(|(key, _)| matcher.is_match(key))
            .map(|(key, element)| (key.clone(), element.clone()))
            .collect())
    }

    async fn persist(&self, element: CacheElement) -> Result<(), StoreError> {
        let delay = *self.persist_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Self::simulated_failure(&self.fail_persist, "persist")?;

        self.elements.write().insert(element.key.clone(), element);
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Self::simulated_failure(&self.fail_remove, "remove")?;
        Ok(self.elements.write().remove(key).is_some())
    }

    async fn remove_all(&self) -> Result<(), StoreError> {
        Self::simulated_failure(&self.fail_remove, "remove")?;
        self.elements.write().clear();
        Ok(())
    }

    async fn key_set(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.elements.read().keys().cloned().collect())
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn current_size(&self) -> Result<usize, StoreError> {
        Ok(self.elements.read().len())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persist_then_fetch() {
        let store = MemoryStore::new();
        store.persist(CacheElement::new("c", "k", "v")).await.unwrap();

        let fetched = store.fetch("k").await.unwrap().unwrap();
        assert_eq!(fetched.value, bytes::Bytes::from("v"));
        assert_eq!(store.persist_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.persist(CacheElement::new("c", "k", "v")).await.unwrap();
        assert!(handle.peek("k").is_some());
    }

    #[tokio::test]
    async fn test_remove_reports_whether_key_existed() {
        let store = MemoryStore::new();
        store.seed(CacheElement::new("c", "k", "v"));

        assert!(store.remove("k").await.unwrap());
        assert!(!store.remove("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_matching_uses_whole_key_pattern() {
        let store = MemoryStore::new();
        store.seed(CacheElement::new("c", "user:1", "a"));
        store.seed(CacheElement::new("c", "user:2", "b"));
        store.seed(CacheElement::new("c", "session:1", "c"));

        let matched = store.fetch_matching("user:\\d").await.unwrap();
        assert_eq!(matched.len(), 2);
        assert!(matched.contains_key("user:1"));
        assert!(!matched.contains_key("session:1"));
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let store = MemoryStore::new();
        store.set_fail_persist(true);
        assert!(store.persist(CacheElement::new("c", "k", "v")).await.is_err());
        assert_eq!(store.persist_count(), 0);

        store.set_fail_fetch(true);
        assert!(matches!(store.fetch("k").await, Err(StoreError::Unavailable(_))));

        store.set_fail_remove(true);
        assert!(store.remove_all().await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_is_recorded() {
        let store = MemoryStore::new();
        assert!(!store.is_shut_down());
        store.shutdown().await.unwrap();
        assert!(store.is_shut_down());
    }
}
