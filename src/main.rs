use std::sync::Arc;

use anyhow::{Context, Result};
use kube::Client;
use tracing::info;

use kobot::config::load_config;
use kobot::progress::ConsoleProgress;
use kobot::report::{open_report, render_json, render_text, write_html_report};
use kobot::scanner::run_scan;
use kobot::{KubeResourceClient, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!(
        namespaces = ?cfg.namespaces,
        kind = %cfg.scan_kind,
        concurrency = cfg.concurrency,
        "Loaded configuration"
    );

    let client = Client::try_default()
        .await
        .context("Failed to connect to cluster. If kubectl can't connect, kobot can't connect either.")?;
    let client = Arc::new(KubeResourceClient::new(client));

    let report = run_scan(client, &cfg, Arc::new(ConsoleProgress))
        .await
        .context("Scan aborted")?;

    let cluster_name = cfg.cluster_name.as_deref();
    match cfg.output_format {
        OutputFormat::Text => println!("\n{}", render_text(&report, cluster_name)),
        OutputFormat::Json => println!("{}", render_json(&report)?),
    }

    if cfg.html_report {
        write_html_report(&report, cluster_name, &cfg.report_path)?;
        if cfg.open_report {
            open_report(&cfg.report_path);
        }
    }

    if report.has_issues() {
        info!(failed_namespaces = report.namespaces_failed, "Issues detected");
    } else {
        info!("No issues detected");
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
