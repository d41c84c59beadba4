use crate::classifier::ErrorCategory;
use crate::spammer::SpamOperation;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_secs: u64,
    pub submissions: SubmissionMetrics,
    pub operations: OperationMetrics,
    pub errors: ErrorMetrics,
    pub rpc: RpcMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionMetrics {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_rate: f64,
}

/// Successful submissions per operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationMetrics {
    pub register: u64,
    pub claim: u64,
    pub delete: u64,
    pub create: u64,
    pub increment: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMetrics {
    pub epoch_mismatch: u64,
    pub insufficient_funds: u64,
    pub object_not_ready: u64,
    pub transport_failure: u64,
    pub unexpected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcMetrics {
    pub rotations: u64,
    pub refetches: u64,
    pub avg_refetch_ms: f64,
    pub min_refetch_ms: u64,
    pub max_refetch_ms: u64,
}

#[derive(Debug)]
pub struct MetricsCollector {
    submissions_total: AtomicU64,
    submissions_success: AtomicU64,
    submissions_failed: AtomicU64,
    operations: [AtomicU64; 5],
    errors: [AtomicU64; 5],
    rotations: AtomicU64,
    refetches: AtomicU64,
    refetch_sum_ms: AtomicU64,
    refetch_min_ms: AtomicU64,
    refetch_max_ms: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            submissions_total: AtomicU64::new(0),
            submissions_success: AtomicU64::new(0),
            submissions_failed: AtomicU64::new(0),
            operations: Default::default(),
            errors: Default::default(),
            rotations: AtomicU64::new(0),
            refetches: AtomicU64::new(0),
            refetch_sum_ms: AtomicU64::new(0),
            refetch_min_ms: AtomicU64::new(u64::MAX),
            refetch_max_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

fn operation_slot(op: SpamOperation) -> usize {
    match op {
        SpamOperation::Register => 0,
        SpamOperation::Claim => 1,
        SpamOperation::Delete => 2,
        SpamOperation::Create => 3,
        SpamOperation::Increment => 4,
    }
}

fn error_slot(category: ErrorCategory) -> usize {
    match category {
        ErrorCategory::EpochMismatch => 0,
        ErrorCategory::InsufficientFunds => 1,
        ErrorCategory::ObjectNotReady => 2,
        ErrorCategory::TransportFailure => 3,
        ErrorCategory::Unexpected => 4,
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self, op: SpamOperation, success: bool) {
        self.submissions_total.fetch_add(1, Ordering::SeqCst);
        if success {
            self.submissions_success.fetch_add(1, Ordering::SeqCst);
            self.operations[operation_slot(op)].fetch_add(1, Ordering::SeqCst);
        } else {
            self.submissions_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn record_error(&self, category: ErrorCategory) {
        self.errors[error_slot(category)].fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_refetch(&self, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        self.refetches.fetch_add(1, Ordering::SeqCst);
        self.refetch_sum_ms.fetch_add(latency_ms, Ordering::SeqCst);
        self.refetch_min_ms.fetch_min(latency_ms, Ordering::SeqCst);
        self.refetch_max_ms.fetch_max(latency_ms, Ordering::SeqCst);
    }

    pub fn successes(&self, op: SpamOperation) -> u64 {
        self.operations[operation_slot(op)].load(Ordering::SeqCst)
    }

    pub fn errors(&self, category: ErrorCategory) -> u64 {
        self.errors[error_slot(category)].load(Ordering::SeqCst)
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::SeqCst)
    }

    pub fn submissions_total(&self) -> u64 {
        self.submissions_total.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.submissions_total.load(Ordering::SeqCst);
        let success = self.submissions_success.load(Ordering::SeqCst);
        let refetches = self.refetches.load(Ordering::SeqCst);
        let refetch_sum = self.refetch_sum_ms.load(Ordering::SeqCst);
        let min_refetch = self.refetch_min_ms.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_secs: self.uptime().as_secs(),
            submissions: SubmissionMetrics {
                total,
                success,
                failed: self.submissions_failed.load(Ordering::SeqCst),
                success_rate: if total > 0 {
                    success as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
            },
            operations: OperationMetrics {
                register: self.successes(SpamOperation::Register),
                claim: self.successes(SpamOperation::Claim),
                delete: self.successes(SpamOperation::Delete),
                create: self.successes(SpamOperation::Create),
                increment: self.successes(SpamOperation::Increment),
            },
            errors: ErrorMetrics {
                epoch_mismatch: self.errors(ErrorCategory::EpochMismatch),
                insufficient_funds: self.errors(ErrorCategory::InsufficientFunds),
                object_not_ready: self.errors(ErrorCategory::ObjectNotReady),
                transport_failure: self.errors(ErrorCategory::TransportFailure),
                unexpected: self.errors(ErrorCategory::Unexpected),
            },
            rpc: RpcMetrics {
                rotations: self.rotations(),
                refetches,
                avg_refetch_ms: if refetches > 0 {
                    refetch_sum as f64 / refetches as f64
                } else {
                    0.0
                },
                min_refetch_ms: if min_refetch == u64::MAX { 0 } else { min_refetch },
                max_refetch_ms: self.refetch_max_ms.load(Ordering::SeqCst),
            },
        }
    }

    pub fn to_json(&self) -> String {
        let snapshot = self.snapshot();
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector() {
        let metrics = MetricsCollector::default();

        metrics.record_submission(SpamOperation::Increment, true);
        metrics.record_submission(SpamOperation::Increment, true);
        metrics.record_submission(SpamOperation::Register, false);
        metrics.record_error(ErrorCategory::ObjectNotReady);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submissions.total, 3);
        assert_eq!(snapshot.submissions.failed, 1);
        assert_eq!(snapshot.operations.increment, 2);
        assert_eq!(snapshot.operations.register, 0);
        assert_eq!(snapshot.errors.object_not_ready, 1);
        assert!((snapshot.submissions.success_rate - 66.67).abs() < 0.1);
    }

    #[test]
    fn test_refetch_latency_bounds() {
        let metrics = MetricsCollector::default();
        assert_eq!(metrics.snapshot().rpc.min_refetch_ms, 0);

        metrics.record_refetch(Duration::from_millis(40));
        metrics.record_refetch(Duration::from_millis(10));

        let rpc = metrics.snapshot().rpc;
        assert_eq!(rpc.refetches, 2);
        assert_eq!(rpc.min_refetch_ms, 10);
        assert_eq!(rpc.max_refetch_ms, 40);
        assert!((rpc.avg_refetch_ms - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_export() {
        let metrics = MetricsCollector::default();
        metrics.record_rotation();

        let json = metrics.to_json();
        assert!(json.contains("submissions"));
        assert!(json.contains("\"rotations\": 1"));
    }
}
