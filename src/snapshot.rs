use k8s_openapi::api::core::v1::{ContainerStatus, Pod, PodCondition};
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A cluster object decoded once after fetch, so classifiers only read plain fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSnapshot {
    Pod(PodSnapshot),
    Release(ReleaseSnapshot),
}

impl ResourceSnapshot {
    pub fn name(&self) -> &str {
        match self {
            ResourceSnapshot::Pod(p) => &p.name,
            ResourceSnapshot::Release(r) => &r.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSnapshot {
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl ConditionSnapshot {
    pub fn new(condition_type: &str, status: &str) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminatedSnapshot {
    pub exit_code: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub name: String,
    pub ready: bool,
    pub restart_count: i32,
    pub waiting_reason: Option<String>,
    pub terminated: Option<TerminatedSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSnapshot {
    pub name: String,
    pub phase: Option<String>,
    pub reason: Option<String>,
    pub conditions: Vec<ConditionSnapshot>,
    pub init_containers: Vec<ContainerSnapshot>,
    pub containers: Vec<ContainerSnapshot>,
}

impl PodSnapshot {
    pub fn phase(&self) -> &str {
        self.phase.as_deref().unwrap_or("")
    }
}

impl From<&Pod> for PodSnapshot {
    fn from(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        let containers = |list: Option<&Vec<ContainerStatus>>| -> Vec<ContainerSnapshot> {
            list.map(|l| l.iter().map(ContainerSnapshot::from).collect())
                .unwrap_or_default()
        };

        PodSnapshot {
            name: pod.metadata.name.clone().unwrap_or_default(),
            phase: status.and_then(|s| s.phase.clone()),
            reason: status.and_then(|s| s.reason.clone()),
            conditions: status
                .and_then(|s| s.conditions.as_ref())
                .map(|conds| conds.iter().map(ConditionSnapshot::from).collect())
                .unwrap_or_default(),
            init_containers: containers(status.and_then(|s| s.init_container_statuses.as_ref())),
            containers: containers(status.and_then(|s| s.container_statuses.as_ref())),
        }
    }
}

impl From<&PodCondition> for ConditionSnapshot {
    fn from(c: &PodCondition) -> Self {
        ConditionSnapshot {
            condition_type: c.type_.clone(),
            status: c.status.clone(),
            reason: c.reason.clone(),
            message: c.message.clone(),
        }
    }
}

impl From<&ContainerStatus> for ContainerSnapshot {
    fn from(cs: &ContainerStatus) -> Self {
        let state = cs.state.as_ref();
        ContainerSnapshot {
            name: cs.name.clone(),
            ready: cs.ready,
            restart_count: cs.restart_count,
            waiting_reason: state
                .and_then(|s| s.waiting.as_ref())
                .map(|w| w.reason.clone().unwrap_or_default()),
            terminated: state.and_then(|s| s.terminated.as_ref()).map(|t| TerminatedSnapshot {
                exit_code: t.exit_code,
                reason: t.reason.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    pub name: String,
    pub suspended: bool,
    pub conditions: Vec<ConditionSnapshot>,
}

// Only the HelmRelease fields the classifier reads. Each part is decoded on
// its own so a broken `status` never hides `spec.suspend`.
#[derive(Debug, Default, Deserialize)]
struct ReleaseSpecFields {
    #[serde(default)]
    suspend: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseStatusFields {
    #[serde(default)]
    conditions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ConditionFields {
    #[serde(rename = "type", default)]
    type_: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn decode_or_default<T: DeserializeOwned + Default>(release: &str, field: &str, value: Option<&Value>) -> T {
    let Some(value) = value else {
        return T::default();
    };
    match T::deserialize(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(release, field, error = %e, "Unable to decode HelmRelease field");
            T::default()
        }
    }
}

impl From<&DynamicObject> for ReleaseSnapshot {
    fn from(obj: &DynamicObject) -> Self {
        let name = obj.metadata.name.clone().unwrap_or_default();
        let spec: ReleaseSpecFields = decode_or_default(&name, "spec", obj.data.get("spec"));
        let status: ReleaseStatusFields = decode_or_default(&name, "status", obj.data.get("status"));

        // unreadable entries are skipped, the rest still count
        let conditions = status
            .conditions
            .iter()
            .filter_map(|raw| match ConditionFields::deserialize(raw) {
                Ok(c) => Some(ConditionSnapshot {
                    condition_type: c.type_,
                    status: c.status.unwrap_or_default(),
                    reason: c.reason,
                    message: c.message,
                }),
                Err(e) => {
                    debug!(release = %name, error = %e, "Skipping malformed HelmRelease condition");
                    None
                }
            })
            .collect();

        ReleaseSnapshot {
            name,
            suspended: spec.suspend,
            conditions,
        }
    }
}
