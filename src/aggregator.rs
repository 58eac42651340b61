use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::types::{NamespaceResult, ResourceKind, ScanReport};

/// Collects finished namespace results from concurrently running scan tasks.
pub struct Aggregator {
    report: Mutex<ScanReport>,
}

impl Aggregator {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            report: Mutex::new(ScanReport::new(kind)),
        }
    }

    /// Fold one finalized namespace result into the totals. Safe to call from any task.
    pub fn record(&self, result: NamespaceResult) {
        let mut report = self.report.lock();
        report.namespaces_checked += 1;
        report.resources_checked += result.resources_checked;
        report.resources_failed += result.resources_failed;
        report.resources_suspended += result.resources_suspended;

        if result.is_failing() {
            report.namespaces_failed += 1;
            report
                .failing_namespaces
                .insert(result.namespace.clone(), result.resources_failed);
        }

        debug!(
            namespace = %result.namespace,
            checked = result.resources_checked,
            failed = result.resources_failed,
            "Recorded namespace result"
        );
        report.per_namespace.insert(result.namespace.clone(), result);
    }

    /// Read-only copy of the totals, taken once every scan task has joined.
    pub fn snapshot(&self) -> ScanReport {
        let mut report = self.report.lock().clone();
        report.finished_at = Utc::now();
        report
    }
}
