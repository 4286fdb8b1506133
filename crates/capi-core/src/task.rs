//! Task files — what the user asks the cluster to run.
//!
//! A task is loaded from a TOML file and is read-only as far as the
//! placement logic is concerned. Only [`Task::demand`] feeds placement;
//! the payload fields (command, volumes, hooks) are copied into the
//! transition verbatim.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::resources::ResourceVector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub owner: String,
    #[serde(default)]
    pub project_id: String,
    pub service: String,
    pub version: String,
    pub resources: Resources,
    /// Volume name → mount description.
    #[serde(default)]
    pub volumes: BTreeMap<String, Volume>,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub start_hook: String,
    #[serde(default)]
    pub status_hook: String,
    /// Network identity, usually filled in by the allocator.
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Resource demand as written in a task file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Percent-of-core units (100 = one core).
    pub cpu: u32,
    /// Bytes.
    pub ram: u64,
    #[serde(default)]
    pub net: u64,
    #[serde(default)]
    pub disk: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub mount: String,
    pub url: String,
}

impl Task {
    /// Load and validate a task file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read task file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parse task file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let task: Task = toml::from_str(content)?;
        task.validate()?;
        Ok(task)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("owner", &self.owner),
            ("service", &self.service),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                bail!("task field `{field}` must not be empty");
            }
        }
        for (name, volume) in &self.volumes {
            if volume.mount.is_empty() {
                bail!("volume `{name}` has no mount point");
            }
        }
        Ok(())
    }

    /// The resource demand used for placement.
    pub fn demand(&self) -> anyhow::Result<ResourceVector> {
        Ok(ResourceVector {
            cpu: i64::from(self.resources.cpu),
            memory: i64::try_from(self.resources.ram).context("ram out of range")?,
            net: i64::try_from(self.resources.net).context("net out of range")?,
            hdd: i64::try_from(self.resources.disk).context("disk out of range")?,
            ..Default::default()
        })
    }

    /// Slot service name identifying this task's workloads in cluster state.
    pub fn slot_service(&self) -> String {
        format!("{}_{}_{}", self.owner, self.service, self.version)
    }

    /// Human-readable identity used in logs and allocator requests.
    pub fn identity(&self) -> String {
        format!("{}/{}/{}@{}", self.owner, self.project_id, self.service, self.version)
    }
}
