//! Backing store adapters
//!
//! The `BackingStore` trait is the seam between the write-behind tier and the
//! slow persistence medium behind it. Two adapters ship with the crate:
//! - **MemoryStore**: in-process map with latency and failure injection
//! - **DirectoryStore**: one data file and one JSON metadata file per key

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::element::CacheElement;

pub use self::directory::DirectoryStore;
pub use self::error::StoreError;
pub use self::memory::MemoryStore;

mod directory;
mod error;
mod memory;

/// Capability interface for the persistence medium behind the tier
///
/// Any call may fail; the tier decides how each failure degrades it.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetch a single element by key
    async fn fetch(&self, key: &str) -> Result<Option<CacheElement>, StoreError>;

    /// Fetch every element whose key matches `pattern` (a regular expression)
    async fn fetch_matching(&self, pattern: &str) -> Result<HashMap<String, CacheElement>, StoreError>;

    /// Durably store an element, replacing any previous value for its key
    async fn persist(&self, element: CacheElement) -> Result<(), StoreError>;

    /// Remove a key; returns true if something was removed
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove every key
    async fn remove_all(&self) -> Result<(), StoreError>;

    /// Keys currently held by the store
    async fn key_set(&self) -> Result<HashSet<String>, StoreError>;

    /// Release resources; the store is not used afterwards
    async fn shutdown(&self) -> Result<(), StoreError>;

    /// Number of elements currently held
    async fn current_size(&self) -> Result<usize, StoreError>;

    /// Human readable location, used in log lines and events
    fn location(&self) -> String;
}
