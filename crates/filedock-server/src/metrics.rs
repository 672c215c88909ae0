//! Prometheus metrics registry for FileDock
//!
//! Counts requests per operation and status, bytes moved through uploads and
//! downloads, change notifications, and the number of suspended polls.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Central metrics registry holding all Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: HTTP requests by (operation, status)
    pub requests_total: IntCounterVec,
    /// Counter: file bytes by direction (upload, download)
    pub bytes_total: IntCounterVec,
    /// Counter: change notifications issued by mutations
    pub notifications_total: IntCounter,
    /// Gauge: polls currently suspended in the change register
    pub poll_waiters: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("filedock".to_string()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total HTTP requests"),
            &["operation", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let bytes_total = IntCounterVec::new(
            Opts::new("bytes_total", "Total file bytes transferred"),
            &["direction"],
        )?;
        registry.register(Box::new(bytes_total.clone()))?;

        let notifications_total = IntCounter::with_opts(Opts::new(
            "notifications_total",
            "Total change notifications",
        ))?;
        registry.register(Box::new(notifications_total.clone()))?;

        let poll_waiters = IntGauge::with_opts(Opts::new(
            "poll_waiters",
            "Polls currently waiting for a change",
        ))?;
        registry.register(Box::new(poll_waiters.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            bytes_total,
            notifications_total,
            poll_waiters,
        })
    }

    /// Record a handled request.
    pub fn record_request(&self, operation: &str, status: u16) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[operation, status.as_str()])
            .inc();
    }

    /// Record file bytes moved in a given direction.
    pub fn record_bytes(&self, direction: &str, bytes: u64) {
        self.bytes_total.with_label_values(&[direction]).inc_by(bytes);
    }

    /// Record one change notification.
    pub fn record_notification(&self) {
        self.notifications_total.inc();
    }

    /// Set the number of suspended polls.
    pub fn set_poll_waiters(&self, count: usize) {
        self.poll_waiters.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        assert!(MetricsRegistry::new().is_ok());
    }

    #[test]
    fn test_encode_after_recording() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.record_request("upload", 200);
        metrics.record_request("upload", 200);
        metrics.record_bytes("upload", 1024);
        metrics.record_notification();
        metrics.set_poll_waiters(3);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("filedock_requests_total{operation=\"upload\",status=\"200\"} 2"));
        assert!(encoded.contains("filedock_bytes_total{direction=\"upload\"} 1024"));
        assert!(encoded.contains("filedock_notifications_total 1"));
        assert!(encoded.contains("filedock_poll_waiters 3"));
    }
}
