//! Mempool metrics.
//!
//! Process-scoped atomic counters and gauges, zeroed on mempool
//! construction. Tests sharing the process must still call `reset`
//! explicitly before asserting on them.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::info;

/// Global metrics instance
pub static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

pub struct Metrics {
    // Admission outcome counters
    pub sent: AtomicI64,
    pub success: AtomicI64,
    pub fail_in_cache: AtomicI64,
    pub fail_too_large: AtomicI64,
    pub fail_is_full: AtomicI64,
    pub fail_pre_check: AtomicI64,
    pub app_fail: AtomicI64,

    // Pool gauges
    pub pool_size: AtomicU64,
    pub pool_bytes: AtomicU64,
    pub gossip_len: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sent: AtomicI64::new(0),
            success: AtomicI64::new(0),
            fail_in_cache: AtomicI64::new(0),
            fail_too_large: AtomicI64::new(0),
            fail_is_full: AtomicI64::new(0),
            fail_pre_check: AtomicI64::new(0),
            app_fail: AtomicI64::new(0),

            pool_size: AtomicU64::new(0),
            pool_bytes: AtomicU64::new(0),
            gossip_len: AtomicU64::new(0),
        }
    }

    pub fn set_pool_gauges(&self, size: u64, bytes: u64, gossip_len: u64) {
        self.pool_size.store(size, Ordering::Relaxed);
        self.pool_bytes.store(bytes, Ordering::Relaxed);
        self.gossip_len.store(gossip_len, Ordering::Relaxed);
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            fail_in_cache: self.fail_in_cache.load(Ordering::Relaxed),
            fail_too_large: self.fail_too_large.load(Ordering::Relaxed),
            fail_is_full: self.fail_is_full.load(Ordering::Relaxed),
            fail_pre_check: self.fail_pre_check.load(Ordering::Relaxed),
            app_fail: self.app_fail.load(Ordering::Relaxed),
            pool_size: self.pool_size.load(Ordering::Relaxed),
            pool_bytes: self.pool_bytes.load(Ordering::Relaxed),
            gossip_len: self.gossip_len.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter and gauge. Tests call this before asserting.
    pub fn reset(&self) {
        self.sent.store(0, Ordering::Relaxed);
        self.success.store(0, Ordering::Relaxed);
        self.fail_in_cache.store(0, Ordering::Relaxed);
        self.fail_too_large.store(0, Ordering::Relaxed);
        self.fail_is_full.store(0, Ordering::Relaxed);
        self.fail_pre_check.store(0, Ordering::Relaxed);
        self.app_fail.store(0, Ordering::Relaxed);
        self.pool_size.store(0, Ordering::Relaxed);
        self.pool_bytes.store(0, Ordering::Relaxed);
        self.gossip_len.store(0, Ordering::Relaxed);
    }

    /// Report the admission outcome counters.
    pub fn log_results(&self) {
        let snap = self.snapshot();
        info!(
            sent = snap.sent,
            success = snap.success,
            fail_in_cache = snap.fail_in_cache,
            fail_too_large = snap.fail_too_large,
            fail_is_full = snap.fail_is_full,
            fail_pre_check = snap.fail_pre_check,
            app_fail = snap.app_fail,
            "mempool result counters"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics snapshot for reporting
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub sent: i64,
    pub success: i64,
    pub fail_in_cache: i64,
    pub fail_too_large: i64,
    pub fail_is_full: i64,
    pub fail_pre_check: i64,
    pub app_fail: i64,
    pub pool_size: u64,
    pub pool_bytes: u64,
    pub gossip_len: u64,
}
