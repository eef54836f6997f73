// Prometheus event logger
//
// Counts cache events and errors per kind and records operation latency.
// Each logger owns its registry so several tiers can coexist in one process.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use super::events::{CacheEvent, CacheEventKind, EventLogger};

/// Event logger backed by prometheus collectors
pub struct PrometheusEventLogger {
    registry: Registry,
    events: IntCounterVec,
    errors: IntCounterVec,
    duration: HistogramVec,
}

impl PrometheusEventLogger {
    /// Create the collectors and register them in a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events = IntCounterVec::new(
            Opts::new("spooltier_cache_events_total", "Total number of cache events by kind"),
            &["kind"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new("spooltier_cache_errors_total", "Total number of cache errors by kind"),
            &["kind"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "spooltier_cache_event_duration_seconds",
                "Duration of cache operations in seconds",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0, 10.0]), // 10μs to 10s
            &["kind"],
        )?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            events,
            errors,
            duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn event_count(&self, kind: CacheEventKind) -> u64 {
        self.events.with_label_values(&[kind.as_str()]).get()
    }

    pub fn error_count(&self, kind: CacheEventKind) -> u64 {
        self.errors.with_label_values(&[kind.as_str()]).get()
    }

    /// Render the registry in the prometheus text exposition format
    pub fn render(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode cache metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl EventLogger for PrometheusEventLogger {
    fn log_event(&self, event: &CacheEvent) {
        let kind = event.kind.as_str();
        self.events.with_label_values(&[kind]).inc();
        self.duration
            .with_label_values(&[kind])
            .observe(event.elapsed.as_secs_f64());
    }

    fn log_error(&self, _source: &str, kind: CacheEventKind, _message: &str) {
        self.errors.with_label_values(&[kind.as_str()]).inc();
    }
}
