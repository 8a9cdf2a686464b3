//! Partition registry: lookup-or-create for per-partition state.
//!
//! The registry is the only owner of partitions. Each partition sits behind
//! its own mutex, so operations on different partitions never contend; the
//! registry's own lock is held only long enough to find or insert the `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::partition::Partition;

/// Shared handle to one partition's serialized state.
pub type PartitionHandle = Arc<Mutex<Partition>>;

/// Lazily creates and hands out partitions keyed by an opaque string.
#[derive(Debug, Default)]
pub struct PartitionRegistry {
    partitions: RwLock<HashMap<String, PartitionHandle>>,
}

impl PartitionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the partition for `key`, creating it on first reference.
    ///
    /// Concurrent callers for the same key always receive the same partition
    /// instance; creation happens exactly once, under the write lock.
    #[must_use]
    pub fn get_or_create(&self, key: &str) -> PartitionHandle {
        if let Some(partition) = self
            .partitions
            .read()
            .expect("lock poisoned")
            .get(key)
        {
            return Arc::clone(partition);
        }

        let mut partitions = self.partitions.write().expect("lock poisoned");
        // Re-check under the write lock: another caller may have created the
        // partition between our read and write acquisitions.
        Arc::clone(
            partitions
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Partition::new()))),
        )
    }

    /// Returns the partition for `key` if it already exists.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<PartitionHandle> {
        self.partitions
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(Arc::clone)
    }

    /// Snapshot of all partitions, for sweeping and stats.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, PartitionHandle)> {
        self.partitions
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(key, partition)| (key.clone(), Arc::clone(partition)))
            .collect()
    }

    /// Number of partitions created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.read().expect("lock poisoned").len()
    }

    /// Whether no partition has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.read().expect("lock poisoned").is_empty()
    }
}
