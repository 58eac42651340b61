use std::path::Path;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{info, warn};

use super::report_title;
use crate::types::ScanReport;

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
  body { font-family: sans-serif; margin: 2rem; color: #222; }
  .totals span { display: inline-block; margin-right: 2rem; font-weight: bold; }
  table { border-collapse: collapse; margin-top: 1.5rem; }
  th, td { border: 1px solid #ccc; padding: 0.4rem 0.8rem; text-align: left; }
  .PASS { color: #1a7f37; }
  .FAIL { color: #cf222e; }
  .ERROR { color: #9a6700; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<p>Scan kind: {{kind}} | Finished: {{finished_at}}</p>
<div class="totals">
  <span>Total namespaces: {{total_namespaces}}</span>
  <span>Total {{noun}}: {{total_resources}}</span>
  <span>Total failed: {{total_failed}}</span>
</div>
<table>
  <thead>
    <tr><th>Namespace</th><th>Status</th><th>Checked</th><th>Failed</th></tr>
  </thead>
  <tbody>
  {{#each rows}}
    <tr>
      <td>{{name}}</td>
      <td class="{{status}}">{{status}}</td>
      <td>{{checked}}</td>
      <td>{{failed}}</td>
    </tr>
  {{/each}}
  </tbody>
</table>
</body>
</html>
"#;

#[derive(Serialize)]
struct HtmlRow<'a> {
    name: &'a str,
    status: &'static str,
    checked: usize,
    failed: usize,
}

#[derive(Serialize)]
struct HtmlContext<'a> {
    title: String,
    kind: String,
    noun: &'static str,
    finished_at: String,
    total_namespaces: usize,
    total_resources: usize,
    total_failed: usize,
    rows: Vec<HtmlRow<'a>>,
}

pub fn render_html(report: &ScanReport, cluster_name: Option<&str>) -> Result<String> {
    let rows = report
        .per_namespace
        .values()
        .map(|r| HtmlRow {
            name: &r.namespace,
            status: r.status.label(),
            checked: r.resources_checked,
            failed: r.resources_failed,
        })
        .collect();

    let context = HtmlContext {
        title: report_title(report.kind, cluster_name),
        kind: report.kind.to_string(),
        noun: report.kind.noun(),
        finished_at: report.finished_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        total_namespaces: report.namespaces_checked,
        total_resources: report.resources_checked,
        total_failed: report.resources_failed,
        rows,
    };

    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
        .render_template(REPORT_TEMPLATE, &context)
        .context("Failed to render HTML report")
}

/// Render the report and write it to `path`, replacing any previous artifact.
pub fn write_html_report(report: &ScanReport, cluster_name: Option<&str>, path: &Path) -> Result<()> {
    let html = render_html(report, cluster_name)?;
    std::fs::write(path, html)
        .with_context(|| format!("Failed to write HTML report to {}", path.display()))?;
    info!(path = %path.display(), "HTML report written");
    Ok(())
}

/// Best effort; a missing browser is not worth failing the run over.
pub fn open_report(path: &Path) {
    let target = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    if let Err(e) = webbrowser::open(&target.to_string_lossy()) {
        warn!(path = %target.display(), error = %e, "Could not open report in a browser");
    }
}
