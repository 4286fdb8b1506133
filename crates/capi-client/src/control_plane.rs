//! HTTP implementation of the control-plane seam.

use std::time::Duration;

use tracing::{debug, info};

use capi_core::config::ControlPlaneConfig;
use capi_state::{
    ApplyGroupTransitionRequest, ApplyGroupTransitionResponse, ApplyOutcome, ClusterState,
    ControlPlane, ControlPlaneError, ControlPlaneFuture, GroupTransition, SchedulerSignature,
    StateFilter,
};

use crate::transport::{JsonTransport, endpoint};

pub const STATE_PATH: &str = "state/full";
pub const APPLY_PATH: &str = "apply/group";

/// Talks to the control plane's JSON API.
///
/// Each call is exactly one HTTP request; retries belong to the caller.
#[derive(Clone)]
pub struct HttpControlPlane {
    base_url: String,
    signature: SchedulerSignature,
    transport: JsonTransport,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>, scheduler_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            signature: SchedulerSignature {
                scheduler_id: scheduler_id.into(),
            },
            transport: JsonTransport::new(timeout),
        }
    }

    pub fn from_config(config: &ControlPlaneConfig) -> Self {
        Self::new(
            config.url.clone(),
            config.scheduler_id.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_state(&self, filter: &StateFilter) -> Result<ClusterState, ControlPlaneError> {
        let url = endpoint(&self.base_url, STATE_PATH);
        debug!(%url, host_filter = %filter.host_filter, "fetching cluster state");
        let state: ClusterState = self.transport.post_json(&url, filter).await?;
        debug!(hosts = state.hosts.len(), "cluster state received");
        Ok(state)
    }

    async fn submit(&self, group: &GroupTransition) -> Result<ApplyOutcome, ControlPlaneError> {
        let url = endpoint(&self.base_url, APPLY_PATH);
        let request = ApplyGroupTransitionRequest {
            scheduler_signature: self.signature.clone(),
            group_transitions: vec![group.clone()],
        };
        info!(
            %url,
            group = %group.group_id,
            operation = %group.group_operation_id,
            transitions = group.transitions.len(),
            "applying group transition"
        );
        let response: ApplyGroupTransitionResponse = self.transport.post_json(&url, &request).await?;
        Ok(ApplyOutcome::new(response.results))
    }
}

impl ControlPlane for HttpControlPlane {
    fn get_state<'a>(&'a self, filter: &'a StateFilter) -> ControlPlaneFuture<'a, ClusterState> {
        Box::pin(self.fetch_state(filter))
    }

    fn apply<'a>(&'a self, group: &'a GroupTransition) -> ControlPlaneFuture<'a, ApplyOutcome> {
        Box::pin(self.submit(group))
    }
}
