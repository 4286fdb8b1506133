//! capi-placement — first-fit host selection.
//!
//! Placement is deliberately simple: walk the snapshot in control-plane
//! order and take the first healthy, non-excluded host whose free
//! capacity covers the demand. There is no scoring and no best-fit;
//! the same snapshot and exclusion set always yield the same host.
//!
//! # Components
//!
//! - **`exclusion`** — hosts disqualified for the rest of a scheduling run
//! - **`first_fit`** — the selection itself

pub mod exclusion;
pub mod first_fit;

pub use exclusion::ExclusionSet;
pub use first_fit::{NoMatchingHost, select};
