//! Cache element types
//!
//! This module defines the values that travel through the auxiliary tier:
//! - `CacheElement`: an immutable (cache name, key, value) triple with attributes
//! - `ElementAttributes`: lifetime and spool permissions attached to an element

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Attributes carried alongside a cached value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttributes {
    /// When the element was created
    pub created_at: SystemTime,
    /// Maximum lifetime, ignored when `is_eternal` is set
    pub max_life: Option<Duration>,
    /// Eternal elements never expire
    pub is_eternal: bool,
    /// Whether the element may be written to an auxiliary tier at all
    pub is_spool: bool,
}

impl Default for ElementAttributes {
    fn default() -> Self {
        Self {
            created_at: SystemTime::now(),
            max_life: None,
            is_eternal: true,
            is_spool: true,
        }
    }
}

impl ElementAttributes {
    /// Attributes for an element that expires `max_life` after creation
    pub fn with_max_life(max_life: Duration) -> Self {
        Self {
            max_life: Some(max_life),
            is_eternal: false,
            ..Self::default()
        }
    }

    /// Check if the element has outlived its max life at `now`
    ///
    /// The tier itself never drops expired elements; backing stores and the
    /// memory cache in front of the tier may use this to do so.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        if self.is_eternal {
            return false;
        }
        match self.max_life {
            Some(max_life) => now
                .duration_since(self.created_at)
                .map(|age| age >= max_life)
                .unwrap_or(false),
            None => false,
        }
    }
}

/// A cached value identified by (cache name, key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheElement {
    /// Name of the cache region this element belongs to
    pub cache_name: String,
    /// Element key, unique within the region
    pub key: String,
    /// The cached value
    pub value: Bytes,
    /// Lifetime and spool attributes
    pub attributes: ElementAttributes,
}

impl CacheElement {
    /// Create an element with default (eternal, spoolable) attributes
    pub fn new(cache_name: impl Into<String>, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            cache_name: cache_name.into(),
            key: key.into(),
            value: value.into(),
            attributes: ElementAttributes::default(),
        }
    }

    /// Replace the element attributes
    pub fn with_attributes(mut self, attributes: ElementAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Approximate size of the element in bytes (key plus value)
    pub fn size_bytes(&self) -> usize {
        self.key.len() + self.value.len()
    }
}
