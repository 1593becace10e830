//! Pool metrics
//!
//! Counters live inside the pool state and are only touched under the pool
//! lock, so they are plain integers rather than atomics.

use serde::Serialize;
use std::time::Duration;

/// Running counters kept by the pool
#[derive(Debug, Default, Clone)]
pub(crate) struct Counters {
    pub(crate) created: u64,
    pub(crate) discarded: u64,
    pub(crate) expired: u64,
    pub(crate) errors: u64,
    pub(crate) timeouts: u64,
    pub(crate) high_water: usize,
    used_total: Duration,
    used_count: u64,
    unused_total: Duration,
    unused_count: u64,
}

impl Counters {
    /// Record the end of a checkout period
    pub(crate) fn record_used(&mut self, held: Duration) {
        self.used_total += held;
        self.used_count += 1;
    }

    /// Record the end of an idle period (entry reserved again)
    pub(crate) fn record_unused(&mut self, idle: Duration) {
        self.unused_total += idle;
        self.unused_count += 1;
    }

    /// Track the largest number of connections seen at once
    pub(crate) fn observe_total(&mut self, total: usize) {
        if total > self.high_water {
            self.high_water = total;
        }
    }

    pub(crate) fn mean_used(&self) -> Duration {
        mean(self.used_total, self.used_count)
    }

    pub(crate) fn mean_unused(&self) -> Duration {
        mean(self.unused_total, self.unused_count)
    }
}

fn mean(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Point-in-time snapshot of a pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolMetrics {
    /// Connections currently tracked by the pool
    pub total: usize,
    /// Connections ready to be allocated
    pub available: usize,
    /// Connections held by callers
    pub in_use: usize,
    /// Connections returned but still enlisted
    pub pending_release: usize,
    /// Callers blocked in allocate
    pub waiting: usize,
    /// Largest total seen since the pool started
    pub high_water: usize,
    /// Connections created since the pool started
    pub created: u64,
    /// Connections destroyed by discard, eviction or error release
    pub discarded: u64,
    /// Connections destroyed by the idle sweeper
    pub expired: u64,
    /// Failed creations, failed releases and adapter errors
    pub errors: u64,
    /// Allocations that gave up with `ResourceExhausted`
    pub timeouts: u64,
    /// Mean checkout duration in milliseconds
    pub mean_used_ms: f64,
    /// Mean idle duration before reuse in milliseconds
    pub mean_unused_ms: f64,
}

impl PoolMetrics {
    /// Fraction of tracked connections held by callers (0.0 to 1.0)
    ///
    /// Returns 0.0 for an empty pool.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.in_use as f64 / self.total as f64
        }
    }
}
