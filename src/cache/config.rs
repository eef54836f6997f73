//! Write-behind tier configuration
//!
//! `SpoolConfig` is the serde form read from YAML; `SpoolSettings` is the
//! validated runtime form with `Duration`s that the tier is built from.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::CacheError;
use super::queue::QueueSettings;

/// Persistence queue failure policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventQueueConfig {
    /// Attempts per job before the queue stops (1 = no retry)
    #[serde(default = "default_max_failure")]
    pub max_failure: u32,
    /// Pause between attempts in milliseconds
    #[serde(default = "default_wait_before_retry_ms")]
    pub wait_before_retry_ms: u64,
}

impl Default for EventQueueConfig {
    fn default() -> Self {
        Self {
            max_failure: default_max_failure(),
            wait_before_retry_ms: default_wait_before_retry_ms(),
        }
    }
}

fn default_max_failure() -> u32 {
    1
}

fn default_wait_before_retry_ms() -> u64 {
    500
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolConfig {
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
    /// Staging area bound; -1 means unbounded
    #[serde(default = "default_max_purgatory_size")]
    pub max_purgatory_size: i64,
    #[serde(default = "default_allow_remove_all")]
    pub allow_remove_all: bool,
    #[serde(default = "default_shutdown_spool_time_limit_secs")]
    pub shutdown_spool_time_limit_secs: u64,
    #[serde(default = "default_drain_poll_interval_ms")]
    pub drain_poll_interval_ms: u64,
    #[serde(default)]
    pub event_queue: EventQueueConfig,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            max_purgatory_size: default_max_purgatory_size(),
            allow_remove_all: default_allow_remove_all(),
            shutdown_spool_time_limit_secs: default_shutdown_spool_time_limit_secs(),
            drain_poll_interval_ms: default_drain_poll_interval_ms(),
            event_queue: EventQueueConfig::default(),
        }
    }
}

fn default_cache_name() -> String {
    "default".to_string()
}

fn default_max_purgatory_size() -> i64 {
    -1 // unbounded
}

fn default_allow_remove_all() -> bool {
    true
}

fn default_shutdown_spool_time_limit_secs() -> u64 {
    60
}

fn default_drain_poll_interval_ms() -> u64 {
    100
}

impl SpoolConfig {
    /// Validate write-behind configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_name.is_empty() {
            return Err("cache_name cannot be empty".to_string());
        }
        if self.max_purgatory_size == 0 || self.max_purgatory_size < -1 {
            return Err(format!(
                "max_purgatory_size must be -1 (unbounded) or positive, got {}",
                self.max_purgatory_size
            ));
        }
        if self.drain_poll_interval_ms == 0 {
            return Err("drain_poll_interval_ms must be greater than 0".to_string());
        }
        if self.event_queue.max_failure == 0 {
            return Err("event_queue.max_failure must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Runtime settings for a write-behind tier
#[derive(Debug, Clone)]
pub struct SpoolSettings {
    pub cache_name: String,
    pub max_purgatory_size: i64,
    pub allow_remove_all: bool,
    /// Upper bound on how long dispose waits for the queue to drain
    pub shutdown_spool_time_limit: Duration,
    pub drain_poll_interval: Duration,
    pub queue: QueueSettings,
}

impl Default for SpoolSettings {
    fn default() -> Self {
        // Defaults always validate
        Self::from_validated(&SpoolConfig::default())
    }
}

impl SpoolSettings {
    fn from_validated(config: &SpoolConfig) -> Self {
        Self {
            cache_name: config.cache_name.clone(),
            max_purgatory_size: config.max_purgatory_size,
            allow_remove_all: config.allow_remove_all,
            shutdown_spool_time_limit: Duration::from_secs(config.shutdown_spool_time_limit_secs),
            drain_poll_interval: Duration::from_millis(config.drain_poll_interval_ms),
            queue: QueueSettings {
                max_failure: config.event_queue.max_failure,
                wait_before_retry: Duration::from_millis(config.event_queue.wait_before_retry_ms),
            },
        }
    }

    /// Settings with the given cache name and defaults otherwise
    pub fn named(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            ..Self::default()
        }
    }
}

impl TryFrom<&SpoolConfig> for SpoolSettings {
    type Error = CacheError;

    fn try_from(config: &SpoolConfig) -> Result<Self, Self::Error> {
        config.validate().map_err(CacheError::Configuration)?;
        Ok(Self::from_validated(config))
    }
}
