use anyhow::{Context, Result};
use colored::Colorize;

use crate::types::{NamespaceStatus, ResourceKind, ScanReport};

pub mod html;

pub use html::{open_report, render_html, write_html_report};

pub fn report_title(kind: ResourceKind, cluster_name: Option<&str>) -> String {
    let title = match kind {
        ResourceKind::Pods => "Kobot Cluster Health Report",
        ResourceKind::PodsDeep => "Kobot Deep Pod Health Report",
        ResourceKind::Releases => "Kobot HelmRelease Readiness Report",
    };
    match cluster_name {
        Some(c) => format!("{} - {}", title, c),
        None => title.to_string(),
    }
}

/// Human-readable summary printed once the scan has joined.
pub fn render_text(report: &ScanReport, cluster_name: Option<&str>) -> String {
    let noun = report.kind.noun();
    let mut lines: Vec<String> = Vec::new();

    lines.push(report_title(report.kind, cluster_name).bold().to_string());
    lines.push(format!("Scan kind: {}", report.kind));
    lines.push(format!("Namespaces checked: {}", report.namespaces_checked));
    lines.push(format!("Total {} checked: {}", noun, report.resources_checked));
    if report.kind == ResourceKind::Releases {
        lines.push(format!("Suspended {}: {}", noun, report.resources_suspended));
    }
    let elapsed = report.finished_at - report.started_at;
    lines.push(format!("Duration: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0));

    if report.kind == ResourceKind::Releases {
        lines.push(String::new());
        lines.extend(release_lines(report));
    }

    lines.push(String::new());
    if !report.has_issues() {
        if report.resources_suspended > 0 {
            lines.push(format!(
                "{} No failing {} were detected; however, {} {} currently suspended. \
                 An operator should investigate the reason for the suspension.",
                "WARN".yellow(),
                noun,
                report.resources_suspended,
                if report.resources_suspended == 1 { "is" } else { "are" }
            ));
        } else {
            lines.push(format!("{} All {} are healthy.", "SUCCESS".green(), noun));
        }
        return lines.join("\n");
    }

    lines.push(format!(
        "{} {} namespace(s) with issues:",
        "FAILED".red(),
        report.namespaces_failed
    ));
    // BTreeMap keys are already sorted by name
    for (ns, failed) in &report.failing_namespaces {
        let line = match report.per_namespace.get(ns) {
            Some(r) if r.status == NamespaceStatus::Error => format!(
                "  - {}: {}",
                ns,
                r.error.as_deref().unwrap_or("unknown error")
            ),
            _ => format!("  - {}: {} unhealthy {}", ns, failed, noun),
        };
        lines.push(line);
        if let Some(result) = report.per_namespace.get(ns) {
            let unhealthy: Vec<_> = result.findings.iter().filter(|f| !f.verdict.healthy).collect();
            for (i, finding) in unhealthy.iter().enumerate() {
                let branch = if i + 1 < unhealthy.len() { "├──" } else { "└──" };
                lines.push(format!("      {} {}", branch, finding.name));
                for reason in &finding.verdict.reasons {
                    lines.push(format!("           ↳ {}", reason));
                }
            }
        }
    }

    lines.push(String::new());
    lines.push(recommendation(report.kind).yellow().to_string());
    lines.join("\n")
}

fn recommendation(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Pods | ResourceKind::PodsDeep => {
            "Recommendation: run `kubectl describe pod -n <namespace> <pod>` on the pods listed above."
        }
        ResourceKind::Releases => {
            "Recommendation: run `flux get helmreleases -n <namespace>` and inspect the failing releases."
        }
    }
}

// One PASS / WARN / FAIL line per release, grouped by namespace.
fn release_lines(report: &ScanReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (ns, result) in &report.per_namespace {
        if result.status == NamespaceStatus::Error {
            continue;
        }
        for finding in &result.findings {
            let reason = finding.verdict.reasons.join("; ");
            if finding.verdict.is_suspended() {
                lines.push(format!("{}  {}/{} (Suspended)", "WARN".yellow(), ns, finding.name));
            } else if !finding.verdict.healthy {
                lines.push(format!("{}  {}/{}: {}", "FAIL".red(), ns, finding.name, reason));
                lines.push(format!(
                    "      HelmRelease remained unhealthy after waiting {}s to transition into Ready",
                    report.grace_period_secs
                ));
            }
        }
        let passed = result
            .resources_checked
            .saturating_sub(result.resources_failed + result.resources_suspended);
        if passed > 0 {
            lines.push(format!("{}  {}: {} HelmRelease(s) Ready", "PASS".green(), ns, passed));
        }
    }
    lines
}

/// Machine-readable form of the report.
pub fn render_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize scan report")
}
