use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Greenlight decision counters
#[derive(Debug, Default)]
pub struct DecisionMetrics {
    pub approvals: AtomicU64,
    pub rejections: AtomicU64,
    pub refused: AtomicU64,
    pub version_conflicts: AtomicU64,
    pub greenlights: AtomicU64,
    pub audit_failures: AtomicU64,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_approval(&self) {
        self.approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refused(&self) {
        self.refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_version_conflict(&self) {
        self.version_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_greenlight(&self) {
        self.greenlights.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audit_failure(&self) {
        self.audit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> DecisionStats {
        DecisionStats {
            approvals: self.approvals.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            version_conflicts: self.version_conflicts.load(Ordering::Relaxed),
            greenlights: self.greenlights.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Greenlight metrics: approvals={}, rejections={}, refused={}, conflicts={}, greenlights={}, audit_failures={}",
            stats.approvals,
            stats.rejections,
            stats.refused,
            stats.version_conflicts,
            stats.greenlights,
            stats.audit_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionStats {
    pub approvals: u64,
    pub rejections: u64,
    pub refused: u64,
    pub version_conflicts: u64,
    pub greenlights: u64,
    pub audit_failures: u64,
}

/// Global metrics instance
static DECISION_METRICS: std::sync::LazyLock<DecisionMetrics> =
    std::sync::LazyLock::new(DecisionMetrics::new);

pub fn decision_metrics() -> &'static DecisionMetrics {
    &DECISION_METRICS
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
