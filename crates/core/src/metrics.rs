use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct GatewayMetrics {
    calls: AtomicU64,
    rejected: AtomicU64,
    allowed: AtomicU64,
    refused: AtomicU64,
    executions: AtomicU64,
    execution_failures: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_refused(&self) {
        self.refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_executions(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub rejected: u64,
    pub allowed: u64,
    pub refused: u64,
    pub executions: u64,
    pub execution_failures: u64,
}

impl MetricsSnapshot {
    pub fn execution_success_rate(&self) -> f64 {
        if self.executions == 0 {
            return 1.0;
        }
        1.0 - (self.execution_failures as f64 / self.executions as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = GatewayMetrics::new();
        metrics.inc_calls();
        metrics.inc_calls();
        metrics.inc_allowed();
        metrics.inc_refused();
        metrics.inc_executions();
        metrics.inc_executions();
        metrics.inc_execution_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.calls, 2);
        assert_eq!(snapshot.allowed, 1);
        assert_eq!(snapshot.refused, 1);
        assert_eq!(snapshot.execution_success_rate(), 0.5);
    }

    #[test]
    fn test_success_rate_without_executions() {
        assert_eq!(GatewayMetrics::new().snapshot().execution_success_rate(), 1.0);
    }
}
