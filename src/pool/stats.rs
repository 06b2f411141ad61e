//! Pool statistics
//!
//! Lifetime counters, updated outside the pool lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Statistics for the connection pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Total connections created
    pub total_created: AtomicUsize,
    /// Total successful leases
    pub total_acquired: AtomicUsize,
    /// Total connections returned to the idle set
    pub total_released: AtomicUsize,
    /// Total connections destroyed (closed, surplus or shutdown)
    pub total_destroyed: AtomicUsize,
    /// Total idle connections discarded for age
    pub total_expired: AtomicUsize,
    /// Total failed prepare calls
    pub total_prepare_failures: AtomicUsize,
}

impl PoolStats {
    /// Create new pool stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection creation
    pub fn record_created(&self) {
        self.total_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful lease
    pub fn record_acquired(&self) {
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection returned to the idle set
    pub fn record_released(&self) {
        self.total_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Record destroyed connections
    pub fn record_destroyed(&self, count: usize) {
        self.total_destroyed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record connections discarded for age
    pub fn record_expired(&self, count: usize) {
        self.total_expired.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed prepare
    pub fn record_prepare_failure(&self) {
        self.total_prepare_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            total_created: self.total_created.load(Ordering::Relaxed),
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            total_destroyed: self.total_destroyed.load(Ordering::Relaxed),
            total_expired: self.total_expired.load(Ordering::Relaxed),
            total_prepare_failures: self.total_prepare_failures.load(Ordering::Relaxed),
        }
    }

    /// Log pool counters
    pub fn log(&self) {
        let stats = self.snapshot();
        debug!(
            "Pool stats: created={}, acquired={}, released={}, destroyed={}, expired={}, prepare_failures={}",
            stats.total_created,
            stats.total_acquired,
            stats.total_released,
            stats.total_destroyed,
            stats.total_expired,
            stats.total_prepare_failures
        );
    }
}

/// Snapshot of pool statistics
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub total_created: usize,
    pub total_acquired: usize,
    pub total_released: usize,
    pub total_destroyed: usize,
    pub total_expired: usize,
    pub total_prepare_failures: usize,
}
