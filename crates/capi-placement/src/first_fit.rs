//! First-fit selection over a cluster snapshot.

use thiserror::Error;
use tracing::{debug, info};

use capi_core::ResourceVector;
use capi_state::HostSnapshot;

use crate::exclusion::ExclusionSet;

/// No host in the snapshot can take the demand.
///
/// The counters explain why: every host lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error(
    "no matching host among {considered} hosts ({unhealthy} not UP, {excluded} excluded, {insufficient} without capacity)"
)]
pub struct NoMatchingHost {
    pub considered: usize,
    pub unhealthy: usize,
    pub excluded: usize,
    pub insufficient: usize,
}

/// Pick the first host, in snapshot order, that is UP, not excluded,
/// and whose free capacity fits `demand`.
pub fn select<'a>(
    snapshot: &'a [HostSnapshot],
    demand: &ResourceVector,
    excluded: &ExclusionSet,
) -> Result<&'a HostSnapshot, NoMatchingHost> {
    let mut miss = NoMatchingHost {
        considered: snapshot.len(),
        ..Default::default()
    };

    for host in snapshot {
        if !host.is_up() {
            miss.unhealthy += 1;
            continue;
        }
        if excluded.contains(&host.id) {
            miss.excluded += 1;
            continue;
        }
        let shortfall = host.free.shortfall(demand);
        if shortfall.is_empty() {
            info!(host = %host.id, etag = host.etag, "found matching host");
            return Ok(host);
        }
        debug!(host = %host.id, dimensions = ?shortfall, "host rejected, insufficient resources");
        miss.insufficient += 1;
    }

    Err(miss)
}
