use std::time::Duration;

use colored::Colorize;

use crate::error::FetchError;
use crate::retry::RetryEvent;
use crate::types::{NamespaceResult, NamespaceStatus, ResourceKind};

/// Operator-facing events from a running scan. The engine never prints on its own.
pub trait ScanProgress: Send + Sync {
    fn scan_started(&self, _kind: ResourceKind, _namespaces: usize) {}

    fn fetch_retry(&self, _namespace: &str, _event: &RetryEvent<'_>) {}

    fn release_recheck(&self, _namespace: &str, _pending: usize, _grace: Duration) {}

    fn namespace_finished(&self, _kind: ResourceKind, _result: &NamespaceResult) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ScanProgress for NoProgress {}

/// Prints one block per event to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ScanProgress for ConsoleProgress {
    fn scan_started(&self, kind: ResourceKind, namespaces: usize) {
        println!(
            "{}    Operator-initiated {} scan across {} namespace(s)",
            "STARTING".green(),
            kind,
            namespaces
        );
    }

    fn fetch_retry(&self, namespace: &str, event: &RetryEvent<'_>) {
        println!("{}", format_retry(namespace, event));
    }

    fn release_recheck(&self, namespace: &str, pending: usize, grace: Duration) {
        println!(
            "{}        Namespace {}: waiting {}s for {} HelmRelease(s) to become Ready",
            "INFO".cyan(),
            namespace,
            grace.as_secs(),
            pending
        );
    }

    fn namespace_finished(&self, kind: ResourceKind, result: &NamespaceResult) {
        println!("{}", format_namespace(kind, result));
    }
}

pub fn format_retry(namespace: &str, event: &RetryEvent<'_>) -> String {
    match event.error {
        FetchError::DeadlineExceeded => format!(
            "{} Scan job on namespace: {} ... {} (attempt {}/{})",
            "TIMEOUT".yellow(),
            namespace,
            "API slow or busy".yellow(),
            event.attempt,
            event.max_attempts
        ),
        _ => format!(
            "{} Scan job on namespace: {} ... {} (attempt {}/{}, retrying in {}ms)",
            "THROTTLED".yellow(),
            namespace,
            "client-side API rate limit hit".yellow(),
            event.attempt,
            event.max_attempts,
            event.backoff.as_millis()
        ),
    }
}

/// The result line for one namespace, followed by a tree of its findings.
pub fn format_namespace(kind: ResourceKind, result: &NamespaceResult) -> String {
    let ns = &result.namespace;
    let noun = kind.noun();

    let mut out = match result.status {
        NamespaceStatus::Error => {
            return format!(
                "{} Scan job on namespace: {} ... {} ({})",
                "ERROR      ".red(),
                ns,
                format!("Unable to list {}", noun).red(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        _ if result.resources_checked == 0 => {
            return format!(
                "{} Scan job on namespace: {} ... {}",
                "RUNNING    ".bright_black(),
                ns,
                format!("SKIP (no {} found)", noun).bright_black()
            );
        }
        NamespaceStatus::Failed => format!(
            "{} Scan job on namespace: {} ... {}",
            "RUNNING    ".blue(),
            ns,
            format!("FAIL ({} {} unhealthy)", result.resources_failed, noun).red()
        ),
        NamespaceStatus::Ok => format!(
            "{} Scan job on namespace: {} ... {}",
            "RUNNING    ".blue(),
            ns,
            format!("PASS ({} {} healthy)", result.resources_checked, noun).green()
        ),
    };

    let shown: Vec<_> = result.findings.iter().filter(|f| !f.verdict.healthy).collect();
    for (i, finding) in shown.iter().enumerate() {
        let branch = if i + 1 < shown.len() { "├──" } else { "└──" };
        out.push_str(&format!("\n        {} {}", branch, finding.name.yellow()));
        for reason in &finding.verdict.reasons {
            out.push_str(&format!("\n             ↳ {}", reason));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HealthState, Verdict};

    #[test]
    fn test_format_failing_namespace_tree() {
        let mut result = NamespaceResult::new("apps");
        result.record("web-0", Verdict::ready());
        result.record(
            "api-0",
            Verdict {
                healthy: false,
                state: HealthState::Degraded,
                reasons: vec![
                    "Container app waiting: CrashLoopBackOff".to_string(),
                    "Container app not ready".to_string(),
                ],
            },
        );
        result.record("api-1", Verdict::unhealthy(HealthState::Failing, "Pod phase: Failed (Reason: Evicted)"));
        let result = result.finish();

        let out = format_namespace(ResourceKind::PodsDeep, &result);
        assert!(out.contains("Scan job on namespace: apps"));
        assert!(out.contains("FAIL (2 pods unhealthy)"));
        assert!(out.contains("├──"));
        assert!(out.contains("└──"));
        assert!(out.contains("↳ Container app waiting: CrashLoopBackOff"));
        assert!(!out.contains("web-0"));
    }

    #[test]
    fn test_format_passing_and_empty_namespaces() {
        let mut result = NamespaceResult::new("monitoring");
        result.record("prom-0", Verdict::ready());
        let out = format_namespace(ResourceKind::Pods, &result.finish());
        assert!(out.contains("PASS (1 pods healthy)"));

        let empty = NamespaceResult::new("empty").finish();
        let out = format_namespace(ResourceKind::Releases, &empty);
        assert!(out.contains("SKIP (no HelmReleases found)"));
    }

    #[test]
    fn test_format_errored_namespace() {
        let result = NamespaceResult::errored("kube-system", "listing failed after 3 attempts");
        let out = format_namespace(ResourceKind::PodsDeep, &result);
        assert!(out.contains("Unable to list pods"));
        assert!(out.contains("listing failed after 3 attempts"));
    }

    #[test]
    fn test_format_retry_lines() {
        let throttled = FetchError::RateLimited("429".to_string());
        let line = format_retry(
            "apps",
            &RetryEvent {
                attempt: 1,
                max_attempts: 3,
                error: &throttled,
                backoff: Duration::from_millis(742),
            },
        );
        assert!(line.contains("attempt 1/3, retrying in 742ms"));

        let timeout = FetchError::DeadlineExceeded;
        let line = format_retry(
            "apps",
            &RetryEvent {
                attempt: 2,
                max_attempts: 3,
                error: &timeout,
                backoff: Duration::from_secs(1),
            },
        );
        assert!(line.contains("(attempt 2/3)"));
    }
}
