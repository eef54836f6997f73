// Cache module
//
// Write-behind auxiliary tier: updates are staged in memory, persisted to a
// backing store by a background queue, and served from staging until then.

pub mod barrier;
pub mod config;
pub mod drain;
pub mod element;
pub mod error;
pub mod events;
pub mod key_lock;
pub mod matcher;
pub mod metrics;
pub mod queue;
pub mod staging;
pub mod stats;
pub mod store;
pub mod traits;
pub mod write_behind;

pub use config::{EventQueueConfig, SpoolConfig, SpoolSettings};
pub use element::{CacheElement, ElementAttributes};
pub use error::CacheError;
pub use events::{CacheEvent, CacheEventKind, EventLogger, TracingEventLogger};
pub use metrics::PrometheusEventLogger;
pub use queue::{QueueSettings, QueueStats};
pub use stats::{CacheStatus, SpoolStats};
pub use store::{BackingStore, DirectoryStore, MemoryStore, StoreError};
pub use traits::AuxiliaryCache;
pub use write_behind::WriteBehindCache;
