//! Cache error types
//!
//! Errors surfaced by the auxiliary tier. Reads and writes never return these;
//! they degrade to misses instead. Removal, inspection and disposal do.

use thiserror::Error;

use super::store::StoreError;

#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store failed
    #[error("Backing store error: {0}")]
    Store(#[from] StoreError),

    /// The persistence queue was destroyed or marked non-functional
    #[error("Persistence queue for cache '{cache_name}' is not working")]
    QueueNotWorking { cache_name: String },

    /// A getMatching pattern failed to compile
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
