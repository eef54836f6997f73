//! Staging area (purgatory) for writes that are not yet persisted
//!
//! A key is staged while a write for it is neither confirmed persisted nor
//! cancelled. The area may be bounded; when it is, inserting past capacity
//! evicts the oldest entry. An evicted entry moves to a spill slot and stays
//! readable there until the caller has persisted it, so eviction never drops
//! the only copy of a write.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::element::CacheElement;

/// A write waiting in the staging area
#[derive(Debug)]
pub struct StagedEntry {
    element: CacheElement,
    /// Invalidation generation the entry was staged under
    generation: u64,
    spoolable: AtomicBool,
}

impl StagedEntry {
    pub fn new(element: CacheElement, generation: u64) -> Self {
        Self {
            element,
            generation,
            spoolable: AtomicBool::new(true),
        }
    }

    pub fn element(&self) -> &CacheElement {
        &self.element
    }

    pub fn key(&self) -> &str {
        &self.element.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the entry is still eligible to be written to the store
    pub fn is_spoolable(&self) -> bool {
        self.spoolable.load(Ordering::Acquire)
    }

    pub fn set_spoolable(&self, spoolable: bool) {
        self.spoolable.store(spoolable, Ordering::Release);
    }
}

fn same(slot: Option<&Arc<StagedEntry>>, entry: &Arc<StagedEntry>) -> bool {
    slot.map(|staged| Arc::ptr_eq(staged, entry)).unwrap_or(false)
}

#[derive(Default)]
struct StagingMap {
    entries: HashMap<String, (u64, Arc<StagedEntry>)>,
    /// Insertion sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
    /// Evicted entries whose spill to the store has not finished
    spilling: HashMap<String, Arc<StagedEntry>>,
}

impl StagingMap {
    fn remove_key(&mut self, key: &str) -> Option<Arc<StagedEntry>> {
        let (seq, entry) = self.entries.remove(key)?;
        self.order.remove(&seq);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<Arc<StagedEntry>> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key).map(|(_, entry)| entry)
    }

    fn staged(&self, key: &str) -> Option<&Arc<StagedEntry>> {
        self.entries.get(key).map(|(_, entry)| entry)
    }
}

/// Keyed holding space for staged writes, guarded by a single mutex
pub struct StagingArea {
    inner: Mutex<StagingMap>,
    /// None means unbounded
    capacity: Option<usize>,
}

impl StagingArea {
    /// Create a staging area; `max_size` of -1 (or any negative) is unbounded
    pub fn new(max_size: i64) -> Self {
        let capacity = usize::try_from(max_size).ok().filter(|&c| c > 0);
        Self {
            inner: Mutex::new(StagingMap::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Stage an entry, replacing any entry for the same key
    ///
    /// Returns the entry evicted to stay within capacity, if any; it sits in
    /// the spill slot until `finish_spill`. A replaced entry, staged or
    /// spilling, is not returned: the newer write supersedes it.
    pub fn insert(&self, entry: Arc<StagedEntry>) -> Option<Arc<StagedEntry>> {
        let mut map = self.inner.lock();
        let key = entry.key().to_string();
        map.remove_key(&key);
        map.spilling.remove(&key);

        let seq = map.next_seq;
        map.next_seq += 1;
        map.order.insert(seq, key.clone());
        map.entries.insert(key, (seq, entry));

        match self.capacity {
            Some(capacity) if map.entries.len() > capacity => {
                let evicted = map.evict_oldest()?;
                map.spilling
                    .insert(evicted.key().to_string(), evicted.clone());
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Newest unpersisted write for `key`, staged or waiting to be spilled
    pub fn get(&self, key: &str) -> Option<Arc<StagedEntry>> {
        let map = self.inner.lock();
        map.staged(key).or_else(|| map.spilling.get(key)).cloned()
    }

    /// Whether `entry` itself (not just its key) is currently staged
    pub fn contains_entry(&self, entry: &Arc<StagedEntry>) -> bool {
        same(self.inner.lock().staged(entry.key()), entry)
    }

    /// Whether `entry` was evicted and is still the newest write for its key
    pub fn is_pending_spill(&self, entry: &Arc<StagedEntry>) -> bool {
        same(self.inner.lock().spilling.get(entry.key()), entry)
    }

    /// Remove `entry` if it is still the staged entry for its key
    pub fn remove_entry(&self, entry: &Arc<StagedEntry>) -> bool {
        let mut map = self.inner.lock();
        let is_current = same(map.staged(entry.key()), entry);
        if is_current {
            map.remove_key(entry.key());
        }
        is_current
    }

    /// Clear the spill slot once `entry` has been dealt with
    pub fn finish_spill(&self, entry: &Arc<StagedEntry>) {
        let mut map = self.inner.lock();
        if same(map.spilling.get(entry.key()), entry) {
            map.spilling.remove(entry.key());
        }
    }

    /// Drop every unpersisted write for `key` and mark it non-spoolable
    ///
    /// Returns whether anything was staged or spilling.
    pub fn cancel(&self, key: &str) -> bool {
        let mut map = self.inner.lock();
        let staged = map.remove_key(key);
        let spilling = map.spilling.remove(key);
        let mut cancelled = false;
        for entry in staged.iter().chain(spilling.iter()) {
            entry.set_spoolable(false);
            cancelled = true;
        }
        cancelled
    }

    /// Replace the contents with a fresh empty map, returning how many writes were dropped
    pub fn reset(&self) -> usize {
        let mut map = self.inner.lock();
        let dropped = std::mem::take(&mut *map);
        dropped.entries.len() + dropped.spilling.len()
    }

    /// Keys with an unpersisted write, staged or spilling
    pub fn keys(&self) -> HashSet<String> {
        let map = self.inner.lock();
        map.entries
            .keys()
            .chain(map.spilling.keys())
            .cloned()
            .collect()
    }

    /// Staged entries, not counting spills in progress
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
