//! Write-behind tier statistics
//!
//! - `CacheStatus`: lifecycle state of the tier
//! - `SpoolStats`: staging counters plus a persistence queue snapshot

use serde::Serialize;
use std::fmt;

use super::queue::QueueStats;

/// Lifecycle state of a write-behind tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Serving reads and accepting writes
    Alive,
    /// Alive, but the persistence queue is gone; writes stay staged only
    Error,
    /// Disposed; reads miss
    Disposed,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStatus::Alive => "ALIVE",
            CacheStatus::Error => "ERROR",
            CacheStatus::Disposed => "DISPOSED",
        };
        f.write_str(name)
    }
}

/// Statistics snapshot for a write-behind tier
#[derive(Debug, Clone, Serialize)]
pub struct SpoolStats {
    pub cache_name: String,
    pub status: CacheStatus,
    /// Reads answered from the staging area without touching the store
    pub purgatory_hits: u64,
    /// Entries currently staged
    pub purgatory_size: usize,
    /// Staging bound, None when unbounded
    pub purgatory_capacity: Option<usize>,
    /// Current invalidation generation, None while a removeAll holds the barrier
    pub generation: Option<u64>,
    pub queue: QueueStats,
}

impl fmt::Display for SpoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Write-Behind Cache: {}", self.cache_name)?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Purgatory Hits: {}", self.purgatory_hits)?;
        writeln!(f, "  Purgatory Size: {}", self.purgatory_size)?;
        writeln!(f, "  Queue Working: {}", self.queue.working)?;
        writeln!(f, "  Queue Pending: {}", self.queue.pending)?;
        write!(f, "  Queue Processed: {}", self.queue.processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> SpoolStats {
        SpoolStats {
            cache_name: "sessions".to_string(),
            status: CacheStatus::Alive,
            purgatory_hits: 12,
            purgatory_size: 3,
            purgatory_capacity: None,
            generation: Some(0),
            queue: QueueStats {
                working: true,
                alive: true,
                pending: 3,
                processed: 40,
                failures: 0,
            },
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CacheStatus::Alive.to_string(), "ALIVE");
        assert_eq!(CacheStatus::Error.to_string(), "ERROR");
        assert_eq!(CacheStatus::Disposed.to_string(), "DISPOSED");
    }

    #[test]
    fn test_stats_display_lists_counters() {
        let text = stats().to_string();
        assert!(text.contains("Purgatory Hits: 12"));
        assert!(text.contains("Purgatory Size: 3"));
        assert!(text.contains("Queue Processed: 40"));
    }

    #[test]
    fn test_stats_serialize_to_json() {
        let json = serde_json::to_value(stats()).unwrap();
        assert_eq!(json["status"], "alive");
        assert_eq!(json["purgatory_hits"], 12);
        assert_eq!(json["queue"]["pending"], 3);
    }
}
