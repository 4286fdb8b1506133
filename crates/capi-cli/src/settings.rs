//! Config file loading and command-line overrides.

use std::path::Path;

use anyhow::{Context, bail};

use capi_core::{Task, ToolConfig};
use capi_scheduler::SchedulerConfig;

/// Load `capi.toml` (or defaults) and apply the global `--capi` override.
pub fn load(path: &Path, capi: Option<&str>) -> anyhow::Result<ToolConfig> {
    let mut config = ToolConfig::load_or_default(path)
        .with_context(|| format!("load config {}", path.display()))?;
    if let Some(url) = capi {
        config.control_plane.url = url.to_string();
    }
    if config.control_plane.url.trim().is_empty() {
        bail!("control plane url is empty");
    }
    Ok(config)
}

/// `submit` flags that take precedence over the config file and task file.
#[derive(Debug, Default)]
pub struct SubmitOverrides {
    pub retries: Option<u32>,
    pub exclude_on_apply_failure: bool,
    pub ip: Option<String>,
    pub hostname: Option<String>,
}

impl SubmitOverrides {
    pub fn scheduler_config(&self, config: &ToolConfig) -> SchedulerConfig {
        let mut scheduler = SchedulerConfig::from_tool_config(config);
        if let Some(retries) = self.retries {
            scheduler.retry_budget = retries;
        }
        if self.exclude_on_apply_failure {
            scheduler.exclude_on_apply_failure = true;
        }
        scheduler
    }

    /// Whether the network identity was given on the command line.
    pub fn has_identity(&self) -> bool {
        self.ip.is_some() && self.hostname.is_some()
    }

    pub fn apply_identity(&self, task: &mut Task) {
        if let Some(ip) = &self.ip {
            task.ip = Some(ip.clone());
        }
        if let Some(hostname) = &self.hostname {
            task.hostname = Some(hostname.clone());
        }
    }
}
