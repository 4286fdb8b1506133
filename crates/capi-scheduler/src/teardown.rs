//! Locating a task's running workloads and tearing them down.

use serde::Serialize;
use tracing::{info, warn};

use capi_core::{Task, UnderflowPolicy};
use capi_state::{
    ControlPlane, ControlPlaneError, HostHealth, HostSnapshot, StateFilter, Workload,
    build_snapshot,
};

use crate::error::{AttemptFailure, FailureKind, ScheduleError, ScheduleResult};
use crate::ids::IdGenerator;
use crate::transition::{TransitionBuilder, owner_for};

/// One running workload of a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskLocation {
    pub host_id: String,
    pub health: HostHealth,
    pub etag: i64,
    pub workload: Workload,
}

/// Every workload in `snapshot` whose slot service belongs to `task`.
pub fn locate_task(snapshot: &[HostSnapshot], task: &Task) -> Vec<TaskLocation> {
    let service = task.slot_service();
    snapshot
        .iter()
        .flat_map(|host| {
            host.workloads
                .iter()
                .filter(|w| w.id.slot.service == service)
                .map(|w| TaskLocation {
                    host_id: host.id.clone(),
                    health: host.health.clone(),
                    etag: host.etag,
                    workload: w.clone(),
                })
        })
        .collect()
}

/// Result of a teardown request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Teardown {
    /// `None` when nothing was running.
    pub group_id: Option<String>,
    pub hosts: Vec<String>,
    pub workloads: usize,
}

/// Fetch state, then submit one transition moving every workload of
/// `task` to REMOVED. Single shot: a rejection is reported, not retried.
pub async fn destroy_task(
    control_plane: &dyn ControlPlane,
    ids: &dyn IdGenerator,
    task: &Task,
    filter: &StateFilter,
    priority: u32,
) -> ScheduleResult<Teardown> {
    let state = control_plane.get_state(filter).await.map_err(fetch_error)?;
    let snapshot = build_snapshot(&state, UnderflowPolicy::Clamp)
        .map_err(|e| ScheduleError::Decode(e.to_string()))?;

    let service = task.slot_service();
    let targets: Vec<(&HostSnapshot, Vec<Workload>)> = snapshot
        .iter()
        .map(|host| {
            let running = host
                .workloads
                .iter()
                .filter(|w| w.id.slot.service == service)
                .cloned()
                .collect::<Vec<_>>();
            (host, running)
        })
        .filter(|(_, running)| !running.is_empty())
        .collect();

    if targets.is_empty() {
        info!(task = %task.identity(), "nothing to remove");
        return Ok(Teardown {
            group_id: None,
            hosts: Vec::new(),
            workloads: 0,
        });
    }

    let owner = owner_for(task, priority);
    let group = TransitionBuilder::new(ids).removal(&owner, &targets);
    let hosts: Vec<String> = group.transitions.iter().map(|t| t.host_id.clone()).collect();
    let workloads: usize = group.transitions.iter().map(|t| t.workloads.len()).sum();

    let outcome = control_plane
        .apply(&group)
        .await
        .map_err(|err| failed(FailureKind::TransportFailure, err.to_string()))?;
    if let Some(reason) = outcome.error_for(&group.group_id) {
        warn!(task = %task.identity(), group = %group.group_id, reason, "removal rejected");
        return Err(failed(FailureKind::StaleVersionToken, reason.to_string()));
    }

    info!(
        task = %task.identity(),
        group = %group.group_id,
        hosts = hosts.len(),
        workloads,
        "removal accepted"
    );
    Ok(Teardown {
        group_id: Some(group.group_id),
        hosts,
        workloads,
    })
}

fn fetch_error(err: ControlPlaneError) -> ScheduleError {
    match err {
        ControlPlaneError::Decode(msg) => ScheduleError::Decode(msg),
        transport => failed(FailureKind::TransportFailure, transport.to_string()),
    }
}

fn failed(kind: FailureKind, reason: String) -> ScheduleError {
    ScheduleError::Failed(AttemptFailure {
        attempt: 1,
        kind,
        host: None,
        reason,
    })
}
