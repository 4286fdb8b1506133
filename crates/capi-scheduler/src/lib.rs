//! capi-scheduler — places a task with a bounded retry loop.
//!
//! A run repeats fetch → snapshot → select → allocate → apply until the
//! control plane accepts a transition or the retry budget runs out.
//! Hosts that fail network allocation are excluded for the rest of the
//! run; stale-etag rejections are retried against fresh state.
//!
//! # Architecture
//!
//! ```text
//!   Task ──▶ RetryScheduler::run
//!              │
//!              ├── ControlPlane::get_state ──▶ build_snapshot
//!              ├── first-fit select (ExclusionSet)
//!              ├── NetworkAllocator::allocate
//!              ├── TransitionBuilder (IdGenerator)
//!              └── ControlPlane::apply ──▶ Placement | retry
//! ```

pub mod error;
pub mod ids;
pub mod network;
pub mod scheduler;
pub mod teardown;
pub mod transition;

pub use error::{AttemptFailure, FailureKind, ScheduleError, ScheduleResult};
pub use ids::{IdGenerator, RandomIds, SeededIds};
pub use network::{AllocationError, AllocationFuture, NetworkAllocator, NetworkIdentity, StaticAllocator};
pub use scheduler::{Placement, RetryScheduler, SchedulerConfig};
pub use teardown::{TaskLocation, Teardown, destroy_task, locate_task};
pub use transition::{TransitionBuilder, owner_for};
