//! The control-plane seam.
//!
//! [`ControlPlane`] is implemented by the HTTP client in `capi-client`
//! and by in-process fakes in tests. Calls are plain request/response
//! round trips; implementations must not retry internally.

use std::future::Future;
use std::pin::Pin;

use crate::error::ControlPlaneError;
use crate::types::{ClusterState, GroupResult, GroupTransition, StateFilter};

/// Boxed future alias for control-plane calls.
pub type ControlPlaneFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ControlPlaneError>> + Send + 'a>>;

pub trait ControlPlane: Send + Sync {
    /// Fetch the cluster state matching `filter`.
    ///
    /// Hosts must be returned in the order the control plane listed
    /// them. Callers rely on that order for first-fit tie-breaking.
    fn get_state<'a>(&'a self, filter: &'a StateFilter) -> ControlPlaneFuture<'a, ClusterState>;

    /// Submit a group transition. A transport-level success may still
    /// carry per-group rejections in the [`ApplyOutcome`].
    fn apply<'a>(&'a self, group: &'a GroupTransition) -> ControlPlaneFuture<'a, ApplyOutcome>;
}

/// Classified response of an accepted apply request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub results: Vec<GroupResult>,
}

impl ApplyOutcome {
    pub fn new(results: Vec<GroupResult>) -> Self {
        Self { results }
    }

    /// The rejection reported for `group_id`, if any.
    ///
    /// The control plane lists rejected groups with an error; a group
    /// that is absent from the results was not rejected.
    pub fn error_for(&self, group_id: &str) -> Option<&str> {
        self.results
            .iter()
            .filter(|r| r.group_id == group_id)
            .find_map(|r| r.error.as_deref())
    }

    pub fn is_accepted(&self, group_id: &str) -> bool {
        self.error_for(group_id).is_none()
    }
}
