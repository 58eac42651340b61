use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::classify::{classify, releases::needs_recheck};
use crate::client::ResourceClient;
use crate::error::{FetchError, ScanError};
use crate::pool::TaskPool;
use crate::progress::ScanProgress;
use crate::resolver::resolve_namespaces;
use crate::retry::{retry_fetch, RetryPolicy, Sleeper, TokioSleeper};
use crate::types::{Config, NamespaceResult, ResourceKind, ScanReport, ScanTarget, Verdict};

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub kind: ResourceKind,
    pub concurrency: usize,
    pub per_call_timeout: Duration,
    pub grace_period: Duration,
    pub retry: RetryPolicy,
}

impl ScanSettings {
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self {
            kind,
            concurrency: kind.default_concurrency(),
            per_call_timeout: kind.default_call_timeout(),
            grace_period: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            kind: cfg.scan_kind,
            concurrency: cfg.concurrency,
            per_call_timeout: cfg.call_timeout,
            grace_period: cfg.grace_period,
            retry: RetryPolicy::default().with_max_attempts(cfg.retry_attempts),
        }
    }

}

// Everything one namespace task needs, shared by all tasks.
struct TaskContext<C: ?Sized> {
    client: Arc<C>,
    settings: ScanSettings,
    sleeper: Arc<dyn Sleeper>,
    progress: Arc<dyn ScanProgress>,
}

/// Runs one pooled task per namespace and folds the results into a report.
pub struct Scanner<C: ResourceClient + ?Sized + 'static> {
    ctx: Arc<TaskContext<C>>,
}

impl<C: ResourceClient + ?Sized + 'static> Scanner<C> {
    pub fn new(client: Arc<C>, settings: ScanSettings, progress: Arc<dyn ScanProgress>) -> Self {
        Self::with_sleeper(client, settings, progress, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        client: Arc<C>,
        settings: ScanSettings,
        progress: Arc<dyn ScanProgress>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            ctx: Arc::new(TaskContext {
                client,
                settings,
                sleeper,
                progress,
            }),
        }
    }

    /// Scan every target. Per-namespace failures end up in the report, never as an error.
    pub async fn scan(&self, targets: Vec<ScanTarget>) -> ScanReport {
        let settings = &self.ctx.settings;
        info!(
            kind = %settings.kind,
            namespaces = targets.len(),
            concurrency = settings.concurrency,
            "Starting scan"
        );
        self.ctx.progress.scan_started(settings.kind, targets.len());

        let aggregator = Arc::new(Aggregator::new(settings.kind));
        let mut pool = TaskPool::new(settings.concurrency);
        let peak = pool.peak_handle();

        for target in targets {
            let ctx = Arc::clone(&self.ctx);
            let aggregator = Arc::clone(&aggregator);
            pool.spawn(move |slot| async move {
                let result = scan_namespace(&ctx, &target.namespace).await;
                drop(slot);
                ctx.progress.namespace_finished(ctx.settings.kind, &result);
                aggregator.record(result);
            });
        }

        let completed = pool.join().await;
        let mut report = aggregator.snapshot();
        if settings.kind == ResourceKind::Releases {
            report.grace_period_secs = settings.grace_period.as_secs();
        }

        info!(
            tasks = completed,
            peak_in_flight = peak.get(),
            namespaces = report.namespaces_checked,
            resources = report.resources_checked,
            failed_namespaces = report.namespaces_failed,
            "Scan complete"
        );
        report
    }
}

async fn scan_namespace<C: ResourceClient + ?Sized>(ctx: &TaskContext<C>, namespace: &str) -> NamespaceResult {
    let settings = &ctx.settings;
    let (kind, limit) = (settings.kind, settings.per_call_timeout);
    let client = ctx.client.as_ref();
    let progress = ctx.progress.as_ref();
    let listed = retry_fetch(
        &settings.retry,
        ctx.sleeper.as_ref(),
        move |_attempt| with_timeout(limit, client.list_resources(kind, namespace)),
        move |event| progress.fetch_retry(namespace, &event),
    )
    .await;

    let resources = match listed {
        Ok(r) => r,
        Err(e) => {
            warn!(namespace, error = %e, "Namespace scan failed");
            return NamespaceResult::errored(namespace, e);
        }
    };

    let mut verdicts: Vec<(String, Verdict)> = resources
        .iter()
        .map(|r| (r.name().to_string(), classify(settings.kind, r)))
        .collect();

    if settings.kind == ResourceKind::Releases {
        recheck_after_grace(ctx, namespace, &mut verdicts).await;
    }

    let mut result = NamespaceResult::new(namespace);
    for (name, verdict) in verdicts {
        result.record(&name, verdict);
    }
    result.finish()
}

// Releases often lag their reconciliation; give unhealthy ones one more look.
async fn recheck_after_grace<C: ResourceClient + ?Sized>(
    ctx: &TaskContext<C>,
    namespace: &str,
    verdicts: &mut [(String, Verdict)],
) {
    let settings = &ctx.settings;
    let pending = verdicts.iter().filter(|entry| needs_recheck(&entry.1)).count();
    if pending == 0 {
        return;
    }

    ctx.progress.release_recheck(namespace, pending, settings.grace_period);
    ctx.sleeper.sleep(settings.grace_period).await;

    for entry in verdicts.iter_mut().filter(|entry| needs_recheck(&entry.1)) {
        let fetched = with_timeout(
            settings.per_call_timeout,
            ctx.client.get_resource(settings.kind, namespace, &entry.0),
        )
        .await;
        match fetched {
            Ok(Some(snapshot)) => entry.1 = classify(settings.kind, &snapshot),
            Ok(None) => warn!(namespace, release = %entry.0, "HelmRelease disappeared during grace period"),
            Err(e) => warn!(namespace, release = %entry.0, error = %e, "Re-check failed, keeping first verdict"),
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl std::future::Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res,
        Err(_) => Err(FetchError::DeadlineExceeded),
    }
}

/// Resolve namespaces and scan them with the configured settings.
pub async fn run_scan<C>(
    client: Arc<C>,
    cfg: &Config,
    progress: Arc<dyn ScanProgress>,
) -> Result<ScanReport, ScanError>
where
    C: ResourceClient + ?Sized + 'static,
{
    let targets = resolve_namespaces(client.as_ref(), &cfg.namespaces).await?;
    let scanner = Scanner::new(client, ScanSettings::from_config(cfg), progress);
    Ok(scanner.scan(targets).await)
}
