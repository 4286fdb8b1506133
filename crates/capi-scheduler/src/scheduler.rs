//! Retry scheduler — the bounded fetch/select/allocate/apply loop.
//!
//! Each attempt fetches fresh cluster state, builds a snapshot, picks
//! the first fitting host outside the exclusion set, allocates a
//! network identity, and submits a group transition at the host's
//! observed etag. Recoverable failures consume one attempt; decode
//! failures abort the run.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use capi_core::{ResourceVector, Task, ToolConfig, UnderflowPolicy};
use capi_placement::{ExclusionSet, select};
use capi_state::{ControlPlane, ControlPlaneError, Owner, StateFilter, build_snapshot};

use crate::error::{AttemptFailure, FailureKind, ScheduleError, ScheduleResult};
use crate::ids::{IdGenerator, RandomIds};
use crate::network::{NetworkAllocator, NetworkIdentity};
use crate::transition::{TransitionBuilder, owner_for};

/// Knobs for a [`RetryScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum attempts per run. Must be at least 1.
    pub retry_budget: u32,
    /// Also exclude a host whose transition the control plane rejected.
    pub exclude_on_apply_failure: bool,
    pub underflow: UnderflowPolicy,
    pub filter: StateFilter,
    pub owner_priority: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_tool_config(&ToolConfig::default())
    }
}

impl SchedulerConfig {
    pub fn from_tool_config(config: &ToolConfig) -> Self {
        Self {
            retry_budget: config.scheduling.retry_budget,
            exclude_on_apply_failure: config.scheduling.exclude_on_apply_failure,
            underflow: config.scheduling.underflow,
            filter: StateFilter::new(
                config.scheduling.host_filter.clone(),
                config.scheduling.workload_filter.clone(),
            ),
            owner_priority: config.owner.priority,
        }
    }

    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn with_exclude_on_apply_failure(mut self, exclude: bool) -> Self {
        self.exclude_on_apply_failure = exclude;
        self
    }
}

/// A successful placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub host_id: String,
    /// Etag the accepted transition was submitted against.
    pub etag: i64,
    pub group_id: String,
    pub group_operation_id: String,
    pub network: NetworkIdentity,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Outcome of a single attempt that did not succeed.
enum AttemptError {
    Retry(AttemptFailure),
    Fatal(ScheduleError),
}

pub struct RetryScheduler {
    control_plane: Arc<dyn ControlPlane>,
    allocator: Arc<dyn NetworkAllocator>,
    ids: Arc<dyn IdGenerator>,
    config: SchedulerConfig,
}

impl RetryScheduler {
    /// Create a scheduler. A retry budget of zero is rejected.
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        allocator: Arc<dyn NetworkAllocator>,
        config: SchedulerConfig,
    ) -> ScheduleResult<Self> {
        if config.retry_budget == 0 {
            return Err(ScheduleError::InvalidConfig(
                "retry budget must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            control_plane,
            allocator,
            ids: Arc::new(RandomIds),
            config,
        })
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Place `task` somewhere in the cluster.
    ///
    /// Runs at most `retry_budget` attempts. The exclusion set lives for
    /// this call only.
    pub async fn run(&self, task: &Task) -> ScheduleResult<Placement> {
        let demand = task
            .demand()
            .map_err(|e| ScheduleError::InvalidTask(format!("{e:#}")))?;
        let owner = owner_for(task, self.config.owner_priority);
        let mut excluded = ExclusionSet::new();
        let mut failures = Vec::new();

        info!(
            task = %task.identity(),
            budget = self.config.retry_budget,
            "scheduling task"
        );

        for attempt in 1..=self.config.retry_budget {
            match self.attempt(attempt, task, &demand, &owner, &mut excluded).await {
                Ok(placement) => {
                    info!(
                        task = %task.identity(),
                        host = %placement.host_id,
                        group = %placement.group_id,
                        attempts = placement.attempts,
                        "task placed"
                    );
                    return Ok(placement);
                }
                Err(AttemptError::Fatal(err)) => {
                    error!(task = %task.identity(), attempt, error = %err, "scheduling aborted");
                    return Err(err);
                }
                Err(AttemptError::Retry(failure)) => {
                    warn!(
                        task = %task.identity(),
                        attempt,
                        kind = %failure.kind,
                        host = failure.host.as_deref().unwrap_or("-"),
                        reason = %failure.reason,
                        excluded = excluded.len(),
                        "attempt failed"
                    );
                    failures.push(failure);
                }
            }
        }

        error!(
            task = %task.identity(),
            attempts = self.config.retry_budget,
            "retry budget exhausted"
        );
        Err(ScheduleError::RetryBudgetExhausted {
            attempts: self.config.retry_budget,
            failures,
        })
    }

    async fn attempt(
        &self,
        attempt: u32,
        task: &Task,
        demand: &ResourceVector,
        owner: &Owner,
        excluded: &mut ExclusionSet,
    ) -> Result<Placement, AttemptError> {
        let retry = |kind: FailureKind, host: Option<&str>, reason: String| {
            AttemptError::Retry(AttemptFailure {
                attempt,
                kind,
                host: host.map(str::to_string),
                reason,
            })
        };

        let state = match self.control_plane.get_state(&self.config.filter).await {
            Ok(state) => state,
            Err(ControlPlaneError::Decode(msg)) => {
                return Err(AttemptError::Fatal(ScheduleError::Decode(msg)));
            }
            Err(err @ ControlPlaneError::Transport { .. }) => {
                return Err(retry(FailureKind::TransportFailure, None, err.to_string()));
            }
        };

        let snapshot = build_snapshot(&state, self.config.underflow)
            .map_err(|e| AttemptError::Fatal(ScheduleError::Decode(e.to_string())))?;
        debug!(attempt, hosts = snapshot.len(), excluded = excluded.len(), "snapshot ready");

        let host = select(&snapshot, demand, excluded)
            .map_err(|miss| retry(FailureKind::NoMatchingHost, None, miss.to_string()))?;

        let network = match self.allocator.allocate(task, &host.id).await {
            Ok(network) => network,
            Err(err) => {
                excluded.exclude(host.id.clone());
                return Err(retry(
                    FailureKind::NetworkAllocationFailed,
                    Some(&host.id),
                    err.to_string(),
                ));
            }
        };

        let group = TransitionBuilder::new(self.ids.as_ref()).placement(host, task, &network, owner);
        debug!(
            attempt,
            host = %host.id,
            etag = host.etag,
            group = %group.group_id,
            "submitting group transition"
        );

        let rejection = match self.control_plane.apply(&group).await {
            Ok(outcome) => outcome
                .error_for(&group.group_id)
                .map(|reason| (FailureKind::StaleVersionToken, reason.to_string())),
            // An unreadable apply response leaves the outcome unknown; the
            // next attempt re-reads state before trying again.
            Err(err) => Some((FailureKind::TransportFailure, err.to_string())),
        };

        if let Some((kind, reason)) = rejection {
            if self.config.exclude_on_apply_failure {
                excluded.exclude(host.id.clone());
            }
            return Err(retry(kind, Some(&host.id), reason));
        }

        Ok(Placement {
            host_id: host.id.clone(),
            etag: host.etag,
            group_id: group.group_id,
            group_operation_id: group.group_operation_id,
            network,
            attempts: attempt,
        })
    }
}
