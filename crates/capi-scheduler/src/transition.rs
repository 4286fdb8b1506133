//! Group transition building.
//!
//! Turns a task, the host it was placed on, and its network identity
//! into the [`GroupTransition`] sent to the control plane. Every build
//! draws fresh group, operation, and configuration ids.

use std::collections::BTreeMap;

use capi_core::{ComputingResources, Task};
use capi_state::{
    ConfigurationId, Container, Entity, GroupTransition, HostSnapshot, Instance, Owner, Resource,
    Resourcelike, Slot, TARGET_ACTIVE, TARGET_REMOVED, Transition, Volume, Workload, WorkloadId,
};

use crate::ids::IdGenerator;
use crate::network::NetworkIdentity;

/// Resource key of the start hook attached to an instance.
pub const START_HOOK_KEY: &str = "iss_hook_start";
/// Resource key of the status hook attached to an instance.
pub const STATUS_HOOK_KEY: &str = "iss_hook_status";

const START_HOOK_ID: &str = "start_hook_id";
const STATUS_HOOK_ID: &str = "status_hook_id";

/// Network mode constraint used when none is configured.
pub const DEFAULT_NET_MODE: &str = "macvlan vlan1478 eth0";
/// Interface the allocated ip is bound to.
pub const DEFAULT_INTERFACE: &str = "eth0";
const VIRT_MODE: &str = "os";

/// Owner record for a task's workloads.
pub fn owner_for(task: &Task, priority: u32) -> Owner {
    Owner {
        owner_id: task.owner.clone(),
        priority,
        project_id: task.project_id.clone(),
    }
}

/// Builds placement and removal transitions.
pub struct TransitionBuilder<'a> {
    ids: &'a dyn IdGenerator,
    net_mode: String,
    interface: String,
}

impl<'a> TransitionBuilder<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self {
            ids,
            net_mode: DEFAULT_NET_MODE.to_string(),
            interface: DEFAULT_INTERFACE.to_string(),
        }
    }

    pub fn with_net_mode(mut self, net_mode: impl Into<String>) -> Self {
        self.net_mode = net_mode.into();
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    /// Group transition placing `task` on `host`.
    ///
    /// Carries exactly one transition, for `host`, at the etag observed
    /// in the snapshot, holding one ACTIVE instance workload.
    pub fn placement(
        &self,
        host: &HostSnapshot,
        task: &Task,
        network: &NetworkIdentity,
        owner: &Owner,
    ) -> GroupTransition {
        GroupTransition {
            owner: owner.clone(),
            group_id: self.prefixed(owner, "group"),
            group_operation_id: self.prefixed(owner, "group_operation"),
            transitions: vec![Transition {
                host_id: host.id.clone(),
                host_state_etag: host.etag,
                workloads: vec![self.workload(task, network, owner)],
            }],
        }
    }

    /// The ACTIVE instance workload for `task`.
    pub fn workload(&self, task: &Task, network: &NetworkIdentity, owner: &Owner) -> Workload {
        Workload {
            id: WorkloadId {
                slot: Slot {
                    service: task.slot_service(),
                    host: network.hostname.clone(),
                },
                configuration: ConfigurationId {
                    group_id: self.prefixed(owner, "configuration"),
                },
            },
            owner: owner.clone(),
            target_state: TARGET_ACTIVE.to_string(),
            entity: Entity::Instance(Instance {
                container: self.container(task, network, owner),
                volumes: volumes(task),
                resources: hooks(task),
            }),
        }
    }

    /// Group transition moving the given workloads to REMOVED.
    ///
    /// One transition per host, each at the etag observed in the
    /// snapshot. Hosts with no workloads are skipped.
    pub fn removal(&self, owner: &Owner, targets: &[(&HostSnapshot, Vec<Workload>)]) -> GroupTransition {
        let transitions = targets
            .iter()
            .filter(|(_, workloads)| !workloads.is_empty())
            .map(|(host, workloads)| Transition {
                host_id: host.id.clone(),
                host_state_etag: host.etag,
                workloads: workloads
                    .iter()
                    .map(|w| Workload {
                        target_state: TARGET_REMOVED.to_string(),
                        ..w.clone()
                    })
                    .collect(),
            })
            .collect();

        GroupTransition {
            owner: owner.clone(),
            group_id: self.prefixed(owner, "group"),
            group_operation_id: self.prefixed(owner, "group_operation"),
            transitions,
        }
    }

    fn container(&self, task: &Task, network: &NetworkIdentity, owner: &Owner) -> Container {
        let mut constraints = BTreeMap::new();
        constraints.insert("meta.memory_limit".to_string(), task.resources.ram.to_string());
        constraints.insert("meta.net".to_string(), self.net_mode.clone());
        constraints.insert("meta.virt_mode".to_string(), VIRT_MODE.to_string());
        constraints.insert("meta.ip".to_string(), format!("{} {}", self.interface, network.ip));
        constraints.insert("meta.hostname".to_string(), network.hostname.clone());
        if !task.command.is_empty() {
            constraints.insert("meta.command".to_string(), task.command.clone());
        }

        Container {
            id: format!("{}_{}", owner.owner_id, self.ids.next_id()),
            constraints,
            computing_resources: Some(ComputingResources {
                cpu_power_percents_core: task.resources.cpu,
                ram_bytes: task.resources.ram,
                hdd_space_bytes: task.resources.disk,
                network_outgoing_bps: task.resources.net,
                ..Default::default()
            }),
        }
    }

    fn prefixed(&self, owner: &Owner, kind: &str) -> String {
        format!("{}_{kind}_{}", owner.owner_id, self.ids.next_id())
    }
}

fn volumes(task: &Task) -> Vec<Volume> {
    task.volumes
        .iter()
        .map(|(name, volume)| Volume {
            mount_point: volume.mount.clone(),
            uuid: name.clone(),
            layers: vec![Resource {
                uuid: name.clone(),
                urls: vec![volume.url.clone()],
            }],
        })
        .collect()
}

fn hooks(task: &Task) -> BTreeMap<String, Resourcelike> {
    let mut resources = BTreeMap::new();
    for (key, id, url) in [
        (START_HOOK_KEY, START_HOOK_ID, &task.start_hook),
        (STATUS_HOOK_KEY, STATUS_HOOK_ID, &task.status_hook),
    ] {
        if url.is_empty() {
            continue;
        }
        resources.insert(
            key.to_string(),
            Resourcelike {
                resource: Resource {
                    uuid: id.to_string(),
                    urls: vec![url.clone()],
                },
            },
        );
    }
    resources
}
