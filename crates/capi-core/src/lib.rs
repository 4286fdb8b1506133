//! capi-core — shared types for the capi placement tools.
//!
//! - **`resources`** — `ResourceVector` and the deduction/fit arithmetic
//! - **`task`** — task files describing a workload to place
//! - **`config`** — `capi.toml` tool configuration

pub mod config;
pub mod error;
pub mod resources;
pub mod task;

pub use config::ToolConfig;
pub use error::{DecodeError, ResourceError};
pub use resources::{
    ComputingResources, Deduction, Dimension, NamedCountable, ResourceVector, UnderflowPolicy,
};
pub use task::{Resources, Task, Volume};
