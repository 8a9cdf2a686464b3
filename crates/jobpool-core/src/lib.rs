//! Partitioned lease pool for ephemeral job handles.
//!
//! `jobpool-core` assigns exclusive, time-bounded leases over a shared pool
//! of reported job handles to many concurrent clients. No two clients ever
//! hold the same handle at once, stale or unhealthy handles are purged
//! automatically, and recently-used handles are temporarily avoided to
//! spread load.
//!
//! # Architecture
//!
//! ```text
//! report  --> admission filter --> entry store upsert
//! next    --> sweep --> candidate selector --> lease grant
//! confirm --> sweep --> lease renewal --> recent-use veto
//! release --> sweep --> lease clear (or quarantine delete)
//! ```
//!
//! State is partitioned by an opaque place key. Each [`Partition`] owns its
//! entry store, recent-use ledger, and counters, and is serialized behind
//! its own mutex by the [`PartitionRegistry`]; operations on different
//! partitions run fully in parallel. The [`Pool`] facade wires the registry
//! to an injected [`Clock`] and the read-only [`PoolConfig`].
//!
//! The core performs no I/O and never panics on untrusted input: policy
//! rejections and empty availability are structured outcomes, and the only
//! true errors are the two `confirm` failure codes.

pub mod admission;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod partition;
pub mod pool;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, PoolConfig};
pub use entry::{Entry, Lease};
pub use error::ConfirmError;
pub use metrics::{MetricsSnapshot, PartitionMetrics};
pub use outcome::{
    GrantedLease, NextOutcome, PartitionStats, RejectReason, ReleaseOutcome, ReportOutcome,
};
pub use partition::{HandleReport, Partition};
pub use pool::Pool;
pub use registry::{PartitionHandle, PartitionRegistry};
