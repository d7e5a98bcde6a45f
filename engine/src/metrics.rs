//! Metrics collection for engine monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Engine metrics.
pub struct EngineMetrics {
    /// Quotes issued.
    pub quotes_issued: AtomicU64,
    /// Total conversions initiated.
    pub conversions_total: AtomicU64,
    /// Completed conversions.
    pub conversions_completed: AtomicU64,
    /// Failed conversions.
    pub conversions_failed: AtomicU64,
    /// Conversions currently settling.
    pub conversions_active: AtomicU64,
    /// Retryable settlement failures observed.
    pub settlement_conflicts: AtomicU64,
    /// Settlement attempts retried after backoff.
    pub settlement_retries: AtomicU64,
    /// Conversions that exhausted every retry.
    pub retries_exhausted: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            quotes_issued: AtomicU64::new(0),
            conversions_total: AtomicU64::new(0),
            conversions_completed: AtomicU64::new(0),
            conversions_failed: AtomicU64::new(0),
            conversions_active: AtomicU64::new(0),
            settlement_conflicts: AtomicU64::new(0),
            settlement_retries: AtomicU64::new(0),
            retries_exhausted: AtomicU64::new(0),
        }
    }

    /// Record a quote issued.
    pub fn quote_issued(&self) {
        self.quotes_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a conversion initiated.
    pub fn conversion_initiated(&self) {
        self.conversions_total.fetch_add(1, Ordering::Relaxed);
        self.conversions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a conversion completed.
    pub fn conversion_completed(&self) {
        self.conversions_completed.fetch_add(1, Ordering::Relaxed);
        self.conversions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a conversion failed.
    pub fn conversion_failed(&self) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
        self.conversions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a retryable settlement failure.
    pub fn settlement_conflict(&self) {
        self.settlement_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a settlement retry.
    pub fn settlement_retry(&self) {
        self.settlement_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a conversion that exhausted its retries.
    pub fn retries_exhausted_inc(&self) {
        self.retries_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            quotes_issued: self.quotes_issued.load(Ordering::Relaxed),
            conversions_total: self.conversions_total.load(Ordering::Relaxed),
            conversions_completed: self.conversions_completed.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            conversions_active: self.conversions_active.load(Ordering::Relaxed),
            settlement_conflicts: self.settlement_conflicts.load(Ordering::Relaxed),
            settlement_retries: self.settlement_retries.load(Ordering::Relaxed),
            retries_exhausted: self.retries_exhausted.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP stablesettle_quotes_issued Total quotes issued
# TYPE stablesettle_quotes_issued counter
stablesettle_quotes_issued {}

# HELP stablesettle_conversions_total Total conversions initiated
# TYPE stablesettle_conversions_total counter
stablesettle_conversions_total {}

# HELP stablesettle_conversions_completed Total completed conversions
# TYPE stablesettle_conversions_completed counter
stablesettle_conversions_completed {}

# HELP stablesettle_conversions_failed Total failed conversions
# TYPE stablesettle_conversions_failed counter
stablesettle_conversions_failed {}

# HELP stablesettle_conversions_active Current conversions settling
# TYPE stablesettle_conversions_active gauge
stablesettle_conversions_active {}

# HELP stablesettle_settlement_conflicts Total retryable settlement failures
# TYPE stablesettle_settlement_conflicts counter
stablesettle_settlement_conflicts {}

# HELP stablesettle_settlement_retries Total settlement retries
# TYPE stablesettle_settlement_retries counter
stablesettle_settlement_retries {}

# HELP stablesettle_retries_exhausted Total conversions that exhausted retries
# TYPE stablesettle_retries_exhausted counter
stablesettle_retries_exhausted {}
"#,
            snapshot.quotes_issued,
            snapshot.conversions_total,
            snapshot.conversions_completed,
            snapshot.conversions_failed,
            snapshot.conversions_active,
            snapshot.settlement_conflicts,
            snapshot.settlement_retries,
            snapshot.retries_exhausted,
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub quotes_issued: u64,
    pub conversions_total: u64,
    pub conversions_completed: u64,
    pub conversions_failed: u64,
    pub conversions_active: u64,
    pub settlement_conflicts: u64,
    pub settlement_retries: u64,
    pub retries_exhausted: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<EngineMetrics>;
