//! Pool entries and the leases held on them.

use serde::{Deserialize, Serialize};

/// An exclusive, time-bounded hold on an entry.
///
/// At most one live lease exists per entry. The lease's total lifetime is
/// capped by the heartbeat window measured from `granted_at`, independent of
/// how far renewals push `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Opaque identity of the holding client.
    pub holder_id: String,
    /// Grant timestamp, milliseconds since epoch.
    pub granted_at: u64,
    /// Expiry timestamp, milliseconds since epoch.
    pub expires_at: u64,
    /// Number of successful confirms applied to this lease.
    pub renewal_count: u32,
}

impl Lease {
    /// Creates a fresh lease for `holder_id` valid for `duration_ms`.
    #[must_use]
    pub fn grant(holder_id: String, now_ms: u64, duration_ms: u64) -> Self {
        Self {
            holder_id,
            granted_at: now_ms,
            expires_at: now_ms.saturating_add(duration_ms),
            renewal_count: 0,
        }
    }

    /// Whether the lease's expiry has passed at `now_ms`.
    #[must_use]
    pub const fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at <= now_ms
    }
}

/// One reported handle and its pool metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque handle identifier, unique within its partition.
    pub handle_id: String,
    /// Current occupancy as last reported.
    pub occupancy: u32,
    /// Capacity as last reported.
    pub capacity: u32,
    /// Opaque region descriptor, passed through unmodified.
    pub region: String,
    /// Opaque latency descriptor, passed through unmodified.
    pub latency_hint: String,
    /// Timestamp of the report that created (or, if configured, last
    /// refreshed) this entry, milliseconds since epoch.
    pub reported_at: u64,
    /// Timestamp of the last lease release or expiry on this entry;
    /// 0 if never assigned.
    pub last_assigned_at: u64,
    /// The active lease, if one is held.
    pub lease: Option<Lease>,
}

impl Entry {
    /// Whether this entry holds a lease that is still live at `now_ms`.
    #[must_use]
    pub fn has_active_lease(&self, now_ms: u64) -> bool {
        self.lease
            .as_ref()
            .is_some_and(|lease| !lease.is_expired_at(now_ms))
    }

    /// Entry age at `now_ms`, in milliseconds.
    #[must_use]
    pub const fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.reported_at)
    }
}
