//! Auxiliary cache trait definition
//!
//! This module defines the `AuxiliaryCache` trait: the operation surface an
//! auxiliary tier exposes to the cache in front of it. Reads and writes never
//! fail from the caller's point of view; a broken backing store shows up as
//! misses. Removal, inspection and disposal report errors.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::element::CacheElement;
use super::error::CacheError;
use super::stats::{CacheStatus, SpoolStats};

#[async_trait]
pub trait AuxiliaryCache: Send + Sync {
    /// Get an element by key; None if missing or the tier is not alive
    async fn get(&self, key: &str) -> Option<CacheElement>;

    /// Get several keys; the result only holds keys that resolved
    async fn get_multiple(&self, keys: &HashSet<String>) -> HashMap<String, CacheElement>;

    /// Get every element whose key matches a regular expression
    async fn get_matching(&self, pattern: &str) -> Result<HashMap<String, CacheElement>, CacheError>;

    /// Store an element; returns before it is persisted
    async fn update(&self, element: CacheElement);

    /// Remove a key; returns true if anything was removed
    async fn remove(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key, if bulk clears are allowed
    async fn remove_all(&self) -> Result<(), CacheError>;

    /// Drain pending writes (bounded), then shut the tier down
    async fn dispose(&self) -> Result<(), CacheError>;

    /// Keys that are staged or persisted
    async fn get_key_set(&self) -> Result<HashSet<String>, CacheError>;

    /// Number of elements held by the backing store
    async fn get_size(&self) -> Result<usize, CacheError>;

    fn get_statistics(&self) -> SpoolStats;

    fn get_status(&self) -> CacheStatus;

    fn get_cache_name(&self) -> &str;
}
