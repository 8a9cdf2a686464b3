//! Per-partition operation counters.
//!
//! Plain integers mutated under the partition lock; the core only ever
//! increments them. External readers take a [`MetricsSnapshot`] via `stats`.

use serde::{Deserialize, Serialize};

/// Monotonically increasing counters for one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMetrics {
    /// Handles inserted for the first time.
    pub total_added: u64,
    /// Reports rejected by policy (restricted, admission filter, pool full).
    pub total_ignored: u64,
    /// Leases granted by `next`.
    pub total_leases: u64,
    /// Successful confirms.
    pub total_confirms: u64,
    /// Releases applied to existing entries.
    pub total_releases: u64,
    /// Entries removed via quarantine release.
    pub total_quarantined: u64,
}

/// A point-in-time copy of a partition's counters.
pub type MetricsSnapshot = PartitionMetrics;
