//! Control-plane protocol types.
//!
//! These mirror the cluster API messages exchanged with the control
//! plane: the full cluster state, workloads, and group transitions.
//! All types are JSON-serializable in the control plane's camelCase form.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use capi_core::ComputingResources;

/// Unique identifier for a host in the cluster.
pub type HostId = String;

/// Target state for a freshly placed workload.
pub const TARGET_ACTIVE: &str = "ACTIVE";
/// Target state asking the control plane to tear a workload down.
pub const TARGET_REMOVED: &str = "REMOVED";

// ── State query ───────────────────────────────────────────────────

/// Selector forwarded verbatim to the state query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFilter {
    pub host_filter: String,
    pub workload_filter: String,
}

impl StateFilter {
    /// Every host, every workload.
    pub fn all() -> Self {
        Self::new("all", "all")
    }

    pub fn new(host: impl Into<String>, workload: impl Into<String>) -> Self {
        Self {
            host_filter: host.into(),
            workload_filter: workload.into(),
        }
    }

    /// A single host with all of its workloads.
    pub fn for_host(host_id: &str) -> Self {
        Self::new(format!("'HostMetadata/id' == '{host_id}'"), "all")
    }
}

/// Request body of the state query.
pub type GetStateRequest = StateFilter;

/// Full cluster state as returned by the control plane.
///
/// Host order is significant: it is the order the control plane
/// returned and the order first-fit walks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterState {
    pub hosts: Vec<HostEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEntry {
    pub metadata: HostMetadata,
    #[serde(default)]
    pub workloads: Vec<Workload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMetadata {
    pub id: HostId,
    /// Version token, changes on every mutation of the host.
    pub etag: i64,
    pub health: HostHealthInfo,
    #[serde(default)]
    pub computing_resources: Option<ComputingResources>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostHealthInfo {
    pub state: HostHealth,
}

/// Host health. Only [`HostHealth::Up`] hosts are placeable; anything
/// the control plane reports that is not a known state is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HostHealth {
    Up,
    Down,
    Maintenance,
    Other(String),
}

impl HostHealth {
    pub fn is_up(&self) -> bool {
        matches!(self, HostHealth::Up)
    }

    pub fn as_str(&self) -> &str {
        match self {
            HostHealth::Up => "UP",
            HostHealth::Down => "DOWN",
            HostHealth::Maintenance => "MAINTENANCE",
            HostHealth::Other(s) => s,
        }
    }
}

impl From<String> for HostHealth {
    fn from(s: String) -> Self {
        match s.as_str() {
            "UP" => HostHealth::Up,
            "DOWN" => HostHealth::Down,
            "MAINTENANCE" => HostHealth::Maintenance,
            _ => HostHealth::Other(s),
        }
    }
}

impl From<HostHealth> for String {
    fn from(h: HostHealth) -> Self {
        h.as_str().to_string()
    }
}

impl fmt::Display for HostHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ── Workloads ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub owner_id: String,
    pub priority: u32,
    #[serde(default)]
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub id: WorkloadId,
    pub owner: Owner,
    pub target_state: String,
    pub entity: Entity,
}

impl Workload {
    /// The container of whichever entity variant this workload carries.
    pub fn container(&self) -> &Container {
        match &self.entity {
            Entity::Instance(instance) => &instance.container,
            Entity::Job(job) => &job.container,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.entity {
            Entity::Instance(_) => "instance",
            Entity::Job(_) => "job",
        }
    }

    /// Short label for logs: `{slot service}@{slot host}`.
    pub fn label(&self) -> String {
        format!("{}@{}", self.id.slot.service, self.id.slot.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadId {
    pub slot: Slot,
    pub configuration: ConfigurationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub service: String,
    #[serde(default)]
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationId {
    pub group_id: String,
}

/// Workload payload: a long-running instance or a batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Entity {
    Instance(Instance),
    Job(Job),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub container: Container,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// Named auxiliary resources (start hook, ...).
    #[serde(default)]
    pub resources: BTreeMap<String, Resourcelike>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub container: Container,
    #[serde(default)]
    pub restart_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
    #[serde(default)]
    pub computing_resources: Option<ComputingResources>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub mount_point: String,
    pub uuid: String,
    #[serde(default)]
    pub layers: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub uuid: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resourcelike {
    pub resource: Resource,
}

// ── Transitions ───────────────────────────────────────────────────

/// Placement change on a single host, guarded by the host's etag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub host_id: HostId,
    pub host_state_etag: i64,
    pub workloads: Vec<Workload>,
}

/// Atomic unit of submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTransition {
    pub owner: Owner,
    pub group_id: String,
    pub group_operation_id: String,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSignature {
    pub scheduler_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyGroupTransitionRequest {
    pub scheduler_signature: SchedulerSignature,
    pub group_transitions: Vec<GroupTransition>,
}

/// Per-group outcome inside an accepted apply response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    pub group_id: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyGroupTransitionResponse {
    pub results: Vec<GroupResult>,
}
