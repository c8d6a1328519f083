//! Settings for the parallel snapshot builder.

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

/// Configuration for the parallel snapshot builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Number of stat workers draining the discovered-path queue.
    pub parallelism: usize,
    /// Capacity of the discovered-path queue.
    pub queue_depth: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            parallelism: 2 * cpus,
            queue_depth: 1024,
        }
    }
}

impl SnapshotConfig {
    /// Same configuration with a fixed worker count (at least one).
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }
}
