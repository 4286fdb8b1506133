//! capi-state — cluster state as the placement tools see it.
//!
//! Holds the control-plane protocol types, the [`ControlPlane`] seam,
//! and the snapshot builder that compacts raw cluster state into
//! per-host total/free capacity.
//!
//! # Architecture
//!
//! ```text
//! ControlPlane::get_state(filter) ──► ClusterState (wire order)
//!                                        │
//!                                        ▼
//!                              build_snapshot(policy)
//!                                        │
//!                                        ▼
//!                     Vec<HostSnapshot> { total, free, health, etag }
//! ```

pub mod control_plane;
pub mod error;
pub mod report;
pub mod snapshot;
pub mod types;

pub use control_plane::{ApplyOutcome, ControlPlane, ControlPlaneFuture};
pub use error::{ControlPlaneError, SnapshotError, SnapshotResult};
pub use snapshot::{HostSnapshot, build_snapshot, find_host, workload_resources};
pub use types::*;
