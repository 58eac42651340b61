use std::collections::HashSet;

use tracing::{info, warn};

use crate::client::ResourceClient;
use crate::error::ScanError;
use crate::types::ScanTarget;

/// Turn the requested namespace names into scan targets.
///
/// With nothing requested every namespace in the cluster is scanned. A failed
/// namespace listing is fatal and is not retried here.
pub async fn resolve_namespaces<C>(client: &C, requested: &[String]) -> Result<Vec<ScanTarget>, ScanError>
where
    C: ResourceClient + ?Sized,
{
    let requested: Vec<&str> = requested
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if requested.is_empty() {
        warn!("No namespaces specified, checking all namespaces");
        let all = client.list_namespaces().await.map_err(ScanError::Discovery)?;
        let targets = dedup(all.iter().map(String::as_str));
        info!(count = targets.len(), "Discovered namespaces");
        return Ok(targets);
    }

    Ok(dedup(requested.into_iter()))
}

// First-seen order wins.
fn dedup<'a>(names: impl Iterator<Item = &'a str>) -> Vec<ScanTarget> {
    let mut seen = HashSet::new();
    names
        .filter(|n| seen.insert(*n))
        .map(ScanTarget::new)
        .collect()
}
