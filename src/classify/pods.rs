use crate::snapshot::{ContainerSnapshot, PodSnapshot};
use crate::types::{HealthState, Verdict};

// Accumulates reasons in rule order. `None` severity marks an informational note.
#[derive(Default)]
struct Findings {
    reasons: Vec<String>,
    worst: Option<HealthState>,
}

impl Findings {
    fn push(&mut self, severity: Option<HealthState>, reason: String) {
        self.reasons.push(reason);
        if let Some(s) = severity {
            match self.worst {
                Some(w) if w.severity() >= s.severity() => {}
                _ => self.worst = Some(s),
            }
        }
    }

    fn into_verdict(self) -> Verdict {
        match self.worst {
            Some(state) => Verdict {
                healthy: false,
                state,
                reasons: self.reasons,
            },
            None => Verdict {
                healthy: true,
                state: HealthState::Ready,
                reasons: self.reasons,
            },
        }
    }
}

/// Quick check: anything not Running or Succeeded is failing.
pub fn classify_pod_phase(pod: &PodSnapshot) -> Verdict {
    match pod.phase() {
        "Running" | "Succeeded" => Verdict::ready(),
        "" => Verdict::unhealthy(HealthState::Failing, "Pod phase: Unknown"),
        phase => Verdict::unhealthy(HealthState::Failing, format!("Pod phase: {}", phase)),
    }
}

/// Deep check over phase, conditions, init containers and containers.
///
/// Reasons are appended in a fixed order so identical snapshots always yield
/// identical verdicts. Restart counts are reported but never make a pod
/// unhealthy on their own.
pub fn classify_pod(pod: &PodSnapshot) -> Verdict {
    // completed pods are not part of failure accounting
    if pod.phase() == "Succeeded" {
        return Verdict::ready();
    }

    let mut findings = Findings::default();
    let reason = pod.reason.as_deref().unwrap_or("");

    if pod.phase() == "Failed" || reason == "Evicted" {
        findings.push(
            Some(HealthState::Failing),
            format!("Pod phase: {} (Reason: {})", pod.phase(), reason),
        );
    }

    for cond in &pod.conditions {
        if cond.is_true() {
            continue;
        }
        match cond.condition_type.as_str() {
            "Ready" => findings.push(
                Some(HealthState::Degraded),
                format!("PodReady=False ({})", cond.reason_text()),
            ),
            "PodScheduled" => findings.push(
                Some(HealthState::Degraded),
                format!("NotScheduled ({})", cond.reason_text()),
            ),
            _ => {}
        }
    }

    for init in &pod.init_containers {
        if let Some(term) = init.terminated.as_ref().filter(|t| t.exit_code != 0) {
            findings.push(
                Some(HealthState::Failing),
                format!(
                    "Init container {} failed (exit {}, reason={})",
                    init.name,
                    term.exit_code,
                    term.reason.as_deref().unwrap_or("")
                ),
            );
        }
    }

    for c in &pod.containers {
        inspect_container(c, &mut findings);
    }

    findings.into_verdict()
}

fn inspect_container(c: &ContainerSnapshot, findings: &mut Findings) {
    if let Some(waiting) = c.waiting_reason.as_deref() {
        if is_backoff_or_error(waiting) {
            findings.push(
                Some(HealthState::Degraded),
                format!("Container {} waiting: {}", c.name, waiting),
            );
        }
    }

    if let Some(term) = c.terminated.as_ref().filter(|t| t.exit_code != 0) {
        findings.push(
            Some(HealthState::Failing),
            format!(
                "Container {} terminated (exit {}, reason={})",
                c.name,
                term.exit_code,
                term.reason.as_deref().unwrap_or("")
            ),
        );
    }

    if !c.ready {
        findings.push(
            Some(HealthState::Degraded),
            format!("Container {} not ready", c.name),
        );
    }

    if c.restart_count > 0 {
        findings.push(
            None,
            format!("Container {} has restarted {} time(s)", c.name, c.restart_count),
        );
    }
}

// CrashLoopBackOff, ImagePullBackOff, ErrImagePull, CreateContainerConfigError, ...
fn is_backoff_or_error(reason: &str) -> bool {
    reason.contains("BackOff") || reason.contains("Err")
}
