use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub namespaces: Vec<String>,
    pub scan_kind: ResourceKind,
    pub concurrency: usize,
    pub call_timeout: Duration,
    pub grace_period: Duration,
    pub retry_attempts: u32,
    pub output_format: OutputFormat,
    pub html_report: bool,
    pub report_path: PathBuf,
    pub open_report: bool,
    pub cluster_name: Option<String>,
}

/// Which resources a scan enumerates and which classifier judges them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Quick phase-only pod check.
    Pods,
    /// Container, condition and init-container level pod inspection.
    PodsDeep,
    /// Flux HelmRelease readiness.
    Releases,
}

impl ResourceKind {
    pub fn default_concurrency(&self) -> usize {
        match self {
            // deep inspection keeps fewer calls in flight to avoid throttling
            ResourceKind::PodsDeep => 4,
            ResourceKind::Pods | ResourceKind::Releases => 10,
        }
    }

    pub fn default_call_timeout(&self) -> Duration {
        match self {
            ResourceKind::Pods => Duration::from_secs(10),
            ResourceKind::PodsDeep => Duration::from_secs(45),
            ResourceKind::Releases => Duration::from_secs(15),
        }
    }

    /// Plural noun used in report lines.
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Pods | ResourceKind::PodsDeep => "pods",
            ResourceKind::Releases => "HelmReleases",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Pods => "pods",
            ResourceKind::PodsDeep => "pods-deep",
            ResourceKind::Releases => "releases",
        };
        f.write_str(s)
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pod" | "pods" | "pod-shallow" => Ok(ResourceKind::Pods),
            "pod-deep" | "pods-deep" | "deep" => Ok(ResourceKind::PodsDeep),
            "release" | "releases" | "helmrelease" | "helmreleases" => Ok(ResourceKind::Releases),
            other => Err(format!("unknown scan kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// One namespace to be scanned by exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTarget {
    pub namespace: String,
}

impl ScanTarget {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HealthState {
    Ready,
    Suspended,
    Degraded,
    Failing,
    Unknown,
}

impl HealthState {
    /// Rank used when several findings disagree; higher wins.
    pub fn severity(&self) -> u8 {
        match self {
            HealthState::Ready => 0,
            HealthState::Suspended => 1,
            HealthState::Unknown => 2,
            HealthState::Degraded => 3,
            HealthState::Failing => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub healthy: bool,
    pub state: HealthState,
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn ready() -> Self {
        Self {
            healthy: true,
            state: HealthState::Ready,
            reasons: Vec::new(),
        }
    }

    pub fn unhealthy(state: HealthState, reason: impl Into<String>) -> Self {
        Self {
            healthy: false,
            state,
            reasons: vec![reason.into()],
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.state == HealthState::Suspended
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NamespaceStatus {
    Ok,
    Failed,
    Error,
}

impl NamespaceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            NamespaceStatus::Ok => "PASS",
            NamespaceStatus::Failed => "FAIL",
            NamespaceStatus::Error => "ERROR",
        }
    }
}

/// A resource whose verdict is worth showing to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFinding {
    pub name: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceResult {
    pub namespace: String,
    pub resources_checked: usize,
    pub resources_failed: usize,
    pub resources_suspended: usize,
    pub failed_names: Vec<String>,
    pub findings: Vec<ResourceFinding>,
    pub status: NamespaceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NamespaceResult {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            resources_checked: 0,
            resources_failed: 0,
            resources_suspended: 0,
            failed_names: Vec::new(),
            findings: Vec::new(),
            status: NamespaceStatus::Ok,
            error: None,
        }
    }

    /// A namespace whose resources could not be listed at all.
    pub fn errored(namespace: impl Into<String>, cause: impl fmt::Display) -> Self {
        let mut result = Self::new(namespace);
        result.status = NamespaceStatus::Error;
        result.error = Some(cause.to_string());
        result
    }

    /// Fold one classified resource into the running counts.
    pub fn record(&mut self, name: &str, verdict: Verdict) {
        self.resources_checked += 1;
        if verdict.is_suspended() {
            self.resources_suspended += 1;
        } else if !verdict.healthy {
            self.resources_failed += 1;
            self.failed_names.push(name.to_string());
        }
        if !verdict.healthy || !verdict.reasons.is_empty() {
            self.findings.push(ResourceFinding {
                name: name.to_string(),
                verdict,
            });
        }
    }

    pub fn finish(mut self) -> Self {
        if self.status != NamespaceStatus::Error {
            self.status = if self.resources_failed > 0 {
                NamespaceStatus::Failed
            } else {
                NamespaceStatus::Ok
            };
        }
        self
    }

    pub fn is_failing(&self) -> bool {
        self.resources_failed > 0 || self.status != NamespaceStatus::Ok
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub kind: ResourceKind,
    pub namespaces_checked: usize,
    pub resources_checked: usize,
    pub resources_failed: usize,
    pub resources_suspended: usize,
    pub namespaces_failed: usize,
    pub per_namespace: BTreeMap<String, NamespaceResult>,
    pub failing_namespaces: BTreeMap<String, usize>,
    /// Wait before unhealthy releases were re-checked; zero for pod scans.
    pub grace_period_secs: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn new(kind: ResourceKind) -> Self {
        let now = Utc::now();
        Self {
            kind,
            namespaces_checked: 0,
            resources_checked: 0,
            resources_failed: 0,
            resources_suspended: 0,
            namespaces_failed: 0,
            per_namespace: BTreeMap::new(),
            failing_namespaces: BTreeMap::new(),
            grace_period_secs: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn has_issues(&self) -> bool {
        self.namespaces_failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("pods".parse::<ResourceKind>(), Ok(ResourceKind::Pods));
        assert_eq!("pod-shallow".parse::<ResourceKind>(), Ok(ResourceKind::Pods));
        assert_eq!("Pods-Deep".parse::<ResourceKind>(), Ok(ResourceKind::PodsDeep));
        assert_eq!(" releases ".parse::<ResourceKind>(), Ok(ResourceKind::Releases));
        assert_eq!("helmrelease".parse::<ResourceKind>(), Ok(ResourceKind::Releases));
        assert!("deployments".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_resource_kind_defaults() {
        assert_eq!(ResourceKind::PodsDeep.default_concurrency(), 4);
        assert_eq!(ResourceKind::Pods.default_concurrency(), 10);
        assert_eq!(ResourceKind::PodsDeep.default_call_timeout(), Duration::from_secs(45));
        assert_eq!(ResourceKind::Releases.noun(), "HelmReleases");
    }

    #[test]
    fn test_namespace_result_counts() {
        let mut result = NamespaceResult::new("apps");
        result.record("web-0", Verdict::ready());
        result.record("web-1", Verdict::unhealthy(HealthState::Failing, "Pod phase: Failed"));
        result.record("batch", Verdict::unhealthy(HealthState::Suspended, "suspended"));
        let result = result.finish();

        assert_eq!(result.resources_checked, 3);
        assert_eq!(result.resources_failed, 1);
        assert_eq!(result.resources_suspended, 1);
        assert_eq!(result.failed_names, vec!["web-1"]);
        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.status, NamespaceStatus::Failed);
        assert!(result.resources_failed <= result.resources_checked);
    }

    #[test]
    fn test_healthy_with_notes_is_kept_as_finding() {
        let mut result = NamespaceResult::new("apps");
        let mut verdict = Verdict::ready();
        verdict.reasons.push("Container app has restarted 2 time(s)".to_string());
        result.record("web-0", verdict);
        let result = result.finish();

        assert_eq!(result.resources_failed, 0);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.status, NamespaceStatus::Ok);
        assert!(!result.is_failing());
    }

    #[test]
    fn test_errored_namespace_stays_errored() {
        let result = NamespaceResult::errored("kube-system", "boom").finish();
        assert_eq!(result.status, NamespaceStatus::Error);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.resources_checked, 0);
        assert!(result.is_failing());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(HealthState::Failing.severity() > HealthState::Degraded.severity());
        assert!(HealthState::Degraded.severity() > HealthState::Suspended.severity());
        assert!(HealthState::Suspended.severity() > HealthState::Ready.severity());
    }
}
