//! Prometheus metrics for daemon observability.
//!
//! Request counters are incremented inline by the HTTP layer; pool-level
//! gauges are refreshed from the core's per-partition counters at scrape
//! time, so the core stays the single source of truth.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors produced while registering or encoding metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a metric.
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    /// Failed to encode the exposition output.
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Daemon metrics registry.
#[derive(Clone)]
pub struct DaemonMetrics {
    registry: Registry,
    http_requests: IntCounterVec,
    partition_entries: IntGaugeVec,
    partition_active_leases: IntGaugeVec,
    partition_vetoes: IntGaugeVec,
    partition_leases_granted: IntGaugeVec,
    partition_confirms: IntGaugeVec,
    partition_quarantined: IntGaugeVec,
}

impl DaemonMetrics {
    /// Creates and registers all metric families.
    ///
    /// # Errors
    ///
    /// Returns an error if any registration fails (duplicate names).
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("jobpool_http_requests_total", "HTTP requests by endpoint"),
            &["endpoint", "outcome"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let partition_entries = IntGaugeVec::new(
            Opts::new("jobpool_partition_entries", "Entries currently pooled"),
            &["partition"],
        )?;
        registry.register(Box::new(partition_entries.clone()))?;

        let partition_active_leases = IntGaugeVec::new(
            Opts::new("jobpool_partition_active_leases", "Live leases"),
            &["partition"],
        )?;
        registry.register(Box::new(partition_active_leases.clone()))?;

        let partition_vetoes = IntGaugeVec::new(
            Opts::new("jobpool_partition_vetoes", "Unexpired recent-use vetoes"),
            &["partition"],
        )?;
        registry.register(Box::new(partition_vetoes.clone()))?;

        let partition_leases_granted = IntGaugeVec::new(
            Opts::new("jobpool_partition_leases_granted", "Leases granted since start"),
            &["partition"],
        )?;
        registry.register(Box::new(partition_leases_granted.clone()))?;

        let partition_confirms = IntGaugeVec::new(
            Opts::new("jobpool_partition_confirms", "Successful confirms since start"),
            &["partition"],
        )?;
        registry.register(Box::new(partition_confirms.clone()))?;

        let partition_quarantined = IntGaugeVec::new(
            Opts::new("jobpool_partition_quarantined", "Entries quarantined since start"),
            &["partition"],
        )?;
        registry.register(Box::new(partition_quarantined.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            partition_entries,
            partition_active_leases,
            partition_vetoes,
            partition_leases_granted,
            partition_confirms,
            partition_quarantined,
        })
    }

    /// Counts one handled request.
    pub fn observe_request(&self, endpoint: &str, outcome: &str) {
        self.http_requests
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    /// Refreshes pool gauges from the core and encodes the exposition text.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    #[allow(clippy::cast_possible_wrap)]
    pub fn encode_text(&self, pool: &jobpool_core::Pool) -> Result<String, MetricsError> {
        for stats in pool.stats(None) {
            let labels = &[stats.partition.as_str()];
            self.partition_entries
                .with_label_values(labels)
                .set(stats.pool_size as i64);
            self.partition_active_leases
                .with_label_values(labels)
                .set(stats.active_leases as i64);
            self.partition_vetoes
                .with_label_values(labels)
                .set(stats.active_vetoes as i64);
            self.partition_leases_granted
                .with_label_values(labels)
                .set(stats.metrics.total_leases as i64);
            self.partition_confirms
                .with_label_values(labels)
                .set(stats.metrics.total_confirms as i64);
            self.partition_quarantined
                .with_label_values(labels)
                .set(stats.metrics.total_quarantined as i64);
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}
