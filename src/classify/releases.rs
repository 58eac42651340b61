use crate::snapshot::ReleaseSnapshot;
use crate::types::{HealthState, Verdict};

pub const SUSPENDED_REASON: &str = "suspended";
pub const READY_MISSING_REASON: &str = "Ready condition missing";

/// Judge a HelmRelease by its suspend flag and its `Ready` condition.
pub fn classify_release(release: &ReleaseSnapshot) -> Verdict {
    if release.suspended {
        return Verdict::unhealthy(HealthState::Suspended, SUSPENDED_REASON);
    }

    let ready = release
        .conditions
        .iter()
        .find(|c| c.condition_type == "Ready");

    match ready {
        Some(cond) => {
            let healthy = cond.is_true();
            // an unhealthy verdict always says why
            let reasons = match cond.reason_text() {
                "" if healthy => Vec::new(),
                "" if cond.status.is_empty() => vec!["Ready=<unset>".to_string()],
                "" => vec![format!("Ready={}", cond.status)],
                r => vec![r.to_string()],
            };
            Verdict {
                healthy,
                state: if healthy { HealthState::Ready } else { HealthState::Failing },
                reasons,
            }
        }
        None => Verdict::unhealthy(HealthState::Unknown, READY_MISSING_REASON),
    }
}

/// Whether an unhealthy verdict deserves a second look after the grace period.
pub fn needs_recheck(verdict: &Verdict) -> bool {
    !verdict.healthy && !verdict.is_suspended()
}
