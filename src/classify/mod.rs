// Health classifiers, one per resource kind
pub mod pods;
pub mod releases;

pub use pods::{classify_pod, classify_pod_phase};
pub use releases::classify_release;

use crate::snapshot::ResourceSnapshot;
use crate::types::{HealthState, ResourceKind, Verdict};

/// Route a snapshot to the classifier for the kind being scanned.
///
/// A snapshot that does not match the scanned kind cannot be judged and is
/// reported as `Unknown`.
pub fn classify(kind: ResourceKind, snapshot: &ResourceSnapshot) -> Verdict {
    match (kind, snapshot) {
        (ResourceKind::Pods, ResourceSnapshot::Pod(pod)) => classify_pod_phase(pod),
        (ResourceKind::PodsDeep, ResourceSnapshot::Pod(pod)) => classify_pod(pod),
        (ResourceKind::Releases, ResourceSnapshot::Release(release)) => classify_release(release),
        _ => Verdict::unhealthy(HealthState::Unknown, format!("unexpected resource for {} scan", kind)),
    }
}
