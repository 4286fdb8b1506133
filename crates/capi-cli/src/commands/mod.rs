pub mod state;
pub mod submit;
pub mod task;

use capi_client::HttpControlPlane;
use capi_core::ToolConfig;
use capi_state::{ControlPlane, HostSnapshot, StateFilter, build_snapshot};

/// Fetch state once and compact it.
pub async fn fetch_snapshot(
    config: &ToolConfig,
    filter: &StateFilter,
) -> anyhow::Result<Vec<HostSnapshot>> {
    let control_plane = HttpControlPlane::from_config(&config.control_plane);
    let state = control_plane.get_state(filter).await?;
    Ok(build_snapshot(&state, config.scheduling.underflow)?)
}
