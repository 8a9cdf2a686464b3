//! Structured operation outcomes.
//!
//! Policy rejections and empty availability are first-class outcomes, not
//! errors: callers must be able to distinguish "rejected by policy" and
//! "nothing eligible right now" from a system failure.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;

/// Why a report was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The handle was flagged restricted by the reporter.
    Restricted,
    /// The admission filter rejected the occupancy/capacity values.
    PlayersFilter,
    /// The partition already holds its maximum number of entries.
    PoolFull,
}

impl RejectReason {
    /// Stable wire code for this rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Restricted => "restricted",
            Self::PlayersFilter => "players_filter",
            Self::PoolFull => "pool_full",
        }
    }
}

/// Result of a `report` call. Always returned; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    /// Whether the handle is now present in the pool.
    pub stored: bool,
    /// Rejection reason when `stored` is false.
    pub reason: Option<RejectReason>,
    /// Partition size after the operation.
    pub pool_size: usize,
}

/// Result of a `next` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextOutcome {
    /// A lease was granted on the returned handle.
    Granted(GrantedLease),
    /// No eligible candidate existed. Normal under load, not an error.
    EmptyPool,
}

/// The handle and lease parameters returned by a successful `next`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedLease {
    /// The leased handle.
    pub handle_id: String,
    /// Occupancy as last reported.
    pub occupancy: u32,
    /// Capacity as last reported.
    pub capacity: u32,
    /// Opaque region descriptor.
    pub region: String,
    /// Opaque latency descriptor.
    pub latency_hint: String,
    /// Initial lease duration, in seconds.
    pub lease_secs: u64,
}

/// Result of a `release` call. Always returned; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// Whether an entry existed for the handle.
    pub existed: bool,
    /// Whether the entry was deleted via quarantine.
    pub quarantined: bool,
}

/// Point-in-time view of one partition, returned by `stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    /// Partition key.
    pub partition: String,
    /// Number of entries currently stored.
    pub pool_size: usize,
    /// Number of entries with a live lease.
    pub active_leases: usize,
    /// Number of unexpired recent-use vetoes.
    pub active_vetoes: usize,
    /// Operation counters.
    pub metrics: MetricsSnapshot,
}
