//! capi.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::resources::UnderflowPolicy;

pub const DEFAULT_CAPI_URL: &str = "http://localhost:8081/proto/v0";
pub const DEFAULT_RETRY_BUDGET: u32 = 3;
pub const DEFAULT_OWNER_PRIORITY: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub control_plane: ControlPlaneConfig,
    pub scheduling: SchedulingConfig,
    pub owner: OwnerConfig,
    pub allocator: AllocatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Base URL, e.g. `http://capi.example:8081/proto/v0`.
    pub url: String,
    pub timeout_secs: u64,
    /// Signature attached to every apply request.
    pub scheduler_id: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CAPI_URL.to_string(),
            timeout_secs: 30,
            scheduler_id: "capi-tools".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub retry_budget: u32,
    /// Also exclude a host for the rest of the run when applying to it fails.
    pub exclude_on_apply_failure: bool,
    pub underflow: UnderflowPolicy,
    pub host_filter: String,
    pub workload_filter: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            exclude_on_apply_failure: false,
            underflow: UnderflowPolicy::Clamp,
            host_filter: "all".to_string(),
            workload_filter: "all".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerConfig {
    pub priority: u32,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_OWNER_PRIORITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Network allocator endpoint. When unset, the task's own ip/hostname is used.
    pub url: Option<String>,
}

impl ToolConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ToolConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
