//! Cache event logging
//!
//! Every façade operation is reported to an optional `EventLogger` once it
//! finishes. Loggers must never panic or block for long; a tier without a
//! logger simply skips the reporting.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Façade operation an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CacheEventKind {
    Get,
    GetMultiple,
    GetMatching,
    Update,
    Remove,
    RemoveAll,
    Dispose,
}

impl CacheEventKind {
    pub const ALL: [CacheEventKind; 7] = [
        CacheEventKind::Get,
        CacheEventKind::GetMultiple,
        CacheEventKind::GetMatching,
        CacheEventKind::Update,
        CacheEventKind::Remove,
        CacheEventKind::RemoveAll,
        CacheEventKind::Dispose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEventKind::Get => "GET",
            CacheEventKind::GetMultiple => "GETMULTIPLE",
            CacheEventKind::GetMatching => "GETMATCHING",
            CacheEventKind::Update => "UPDATE",
            CacheEventKind::Remove => "REMOVE",
            CacheEventKind::RemoveAll => "REMOVEALL",
            CacheEventKind::Dispose => "DISPOSE",
        }
    }
}

impl fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished façade operation
#[derive(Debug, Clone, Serialize)]
pub struct CacheEvent {
    /// Component that produced the event
    pub source: String,
    /// Cache region (cache name)
    pub region: String,
    pub kind: CacheEventKind,
    /// Key or pattern the operation targeted, if any
    pub key: Option<String>,
    /// Backing store location
    pub detail: String,
    pub elapsed: Duration,
}

/// Sink for cache events
pub trait EventLogger: Send + Sync {
    fn log_event(&self, event: &CacheEvent);

    fn log_error(&self, source: &str, kind: CacheEventKind, message: &str);
}

/// Event logger that writes through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn log_event(&self, event: &CacheEvent) {
        tracing::debug!(
            source = %event.source,
            region = %event.region,
            kind = %event.kind,
            key = event.key.as_deref().unwrap_or(""),
            detail = %event.detail,
            elapsed_us = event.elapsed.as_micros() as u64,
            "Cache event"
        );
    }

    fn log_error(&self, source: &str, kind: CacheEventKind, message: &str) {
        tracing::warn!(source = %source, kind = %kind, message = %message, "Cache event error");
    }
}

/// Emits its event to the logger when dropped
pub(crate) struct EventScope<'a> {
    logger: Option<&'a dyn EventLogger>,
    event: Option<CacheEvent>,
    started: Instant,
}

impl<'a> EventScope<'a> {
    pub(crate) fn begin(
        logger: Option<&'a dyn EventLogger>,
        source: &str,
        region: &str,
        kind: CacheEventKind,
        key: Option<&str>,
        detail: impl FnOnce() -> String,
    ) -> Self {
        // Skip building the event entirely when nobody listens
        let event = logger.map(|_| CacheEvent {
            source: source.to_string(),
            region: region.to_string(),
            kind,
            key: key.map(str::to_string),
            detail: detail(),
            elapsed: Duration::ZERO,
        });
        Self {
            logger,
            event,
            started: Instant::now(),
        }
    }
}

impl Drop for EventScope<'_> {
    fn drop(&mut self) {
        if let (Some(logger), Some(mut event)) = (self.logger, self.event.take()) {
            event.elapsed = self.started.elapsed();
            logger.log_event(&event);
        }
    }
}
