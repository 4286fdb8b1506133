//! Compact cluster snapshots.
//!
//! Turns a raw [`ClusterState`] into one [`HostSnapshot`] per host,
//! carrying total and free capacity. Free capacity is the host total
//! minus the resources of every workload running on it, whichever
//! entity variant the workload carries.
//!
//! Snapshots preserve the control plane's host order and are rebuilt
//! for every scheduling attempt.

use serde::Serialize;
use tracing::{debug, warn};

use capi_core::{DecodeError, ResourceVector, UnderflowPolicy};

use crate::error::{SnapshotError, SnapshotResult};
use crate::types::{ClusterState, Entity, HostEntry, HostHealth, HostId, Workload};

/// Per-host view used by placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostSnapshot {
    pub id: HostId,
    pub etag: i64,
    pub health: HostHealth,
    pub location: String,
    pub total: ResourceVector,
    pub free: ResourceVector,
    pub workloads: Vec<Workload>,
}

impl HostSnapshot {
    pub fn is_up(&self) -> bool {
        self.health.is_up()
    }
}

/// Build a snapshot of every host in `state`, in the order given.
///
/// Any undecodable host or workload fails the whole snapshot. Under
/// [`UnderflowPolicy::Clamp`] a workload that overdraws its host is
/// logged and the affected dimensions are clamped to zero; under
/// [`UnderflowPolicy::Strict`] it is an error.
pub fn build_snapshot(
    state: &ClusterState,
    policy: UnderflowPolicy,
) -> SnapshotResult<Vec<HostSnapshot>> {
    let snapshot = state
        .hosts
        .iter()
        .map(|host| compact_host(host, policy))
        .collect::<SnapshotResult<Vec<_>>>()?;
    debug!(hosts = snapshot.len(), "cluster snapshot built");
    Ok(snapshot)
}

fn compact_host(host: &HostEntry, policy: UnderflowPolicy) -> SnapshotResult<HostSnapshot> {
    let meta = &host.metadata;
    let total = ResourceVector::decode(meta.computing_resources.as_ref(), &format!("host {}", meta.id))?;
    let mut free = total.clone();

    for workload in &host.workloads {
        let used = workload_resources(&meta.id, workload)?;
        let deduction = free
            .subtract(&used, policy)
            .map_err(|source| SnapshotError::Overdrawn {
                host: meta.id.clone(),
                workload: workload.label(),
                source,
            })?;
        if !deduction.is_clean() {
            warn!(
                host = %meta.id,
                workload = %workload.label(),
                dimensions = ?deduction.underflow,
                "workload exceeds recorded host capacity, clamping free resources"
            );
        }
        free = deduction.remaining;
    }

    Ok(HostSnapshot {
        id: meta.id.clone(),
        etag: meta.etag,
        health: meta.health.state.clone(),
        location: meta.location.clone(),
        total,
        free,
        workloads: host.workloads.clone(),
    })
}

/// Decode the resources of a running workload.
pub fn workload_resources(host_id: &str, workload: &Workload) -> Result<ResourceVector, DecodeError> {
    let (kind, container) = match &workload.entity {
        Entity::Instance(instance) => ("instance", &instance.container),
        Entity::Job(job) => ("job", &job.container),
    };
    let context = format!("{kind} {} on host {host_id}", workload.label());
    ResourceVector::decode(container.computing_resources.as_ref(), &context)
}

/// Find a host by id.
pub fn find_host<'a>(snapshot: &'a [HostSnapshot], host_id: &str) -> Option<&'a HostSnapshot> {
    snapshot.iter().find(|h| h.id == host_id)
}
