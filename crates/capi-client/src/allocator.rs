//! Network allocator backed by an HTTP service.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use capi_core::Task;
use capi_core::config::AllocatorConfig;
use capi_scheduler::{
    AllocationError, AllocationFuture, NetworkAllocator, NetworkIdentity, StaticAllocator,
};

use crate::transport::{JsonTransport, endpoint};

pub const ALLOCATE_PATH: &str = "allocate";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocateRequest<'a> {
    owner: &'a str,
    project_id: &'a str,
    service: &'a str,
    version: &'a str,
    host_id: &'a str,
}

/// POSTs `{owner, projectId, service, version, hostId}` to
/// `{url}/allocate` and expects `{ip, hostname}` back.
#[derive(Clone)]
pub struct HttpAllocator {
    url: String,
    transport: JsonTransport,
}

impl HttpAllocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            transport: JsonTransport::new(timeout),
        }
    }

    async fn request(&self, task: &Task, host_id: &str) -> Result<NetworkIdentity, AllocationError> {
        let url = endpoint(&self.url, ALLOCATE_PATH);
        let body = AllocateRequest {
            owner: &task.owner,
            project_id: &task.project_id,
            service: &task.service,
            version: &task.version,
            host_id,
        };
        let identity: NetworkIdentity = self.transport.post_json(&url, &body).await?;
        if identity.ip.is_empty() || identity.hostname.is_empty() {
            return Err(AllocationError::Unavailable {
                task: task.identity(),
                host: host_id.to_string(),
            });
        }
        info!(host = %host_id, ip = %identity.ip, hostname = %identity.hostname, "network identity allocated");
        Ok(identity)
    }
}

impl NetworkAllocator for HttpAllocator {
    fn allocate<'a>(&'a self, task: &'a Task, host_id: &'a str) -> AllocationFuture<'a> {
        Box::pin(self.request(task, host_id))
    }
}

/// The allocator named by `config`, or the task-file allocator when no
/// allocator url is configured.
pub fn allocator_from_config(config: &AllocatorConfig, timeout: Duration) -> Arc<dyn NetworkAllocator> {
    match &config.url {
        Some(url) if !url.is_empty() => Arc::new(HttpAllocator::new(url.clone(), timeout)),
        _ => Arc::new(StaticAllocator),
    }
}
