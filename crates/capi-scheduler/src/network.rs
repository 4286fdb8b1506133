//! Network identity allocation seam.
//!
//! A placed workload needs an ip and a hostname before the transition
//! is built. Allocation is delegated to a [`NetworkAllocator`]; the
//! HTTP-backed implementation lives in `capi-client`.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use capi_core::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub ip: String,
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("no network identity available for {task} on {host}")]
    Unavailable { task: String, host: String },

    #[error("network allocator failed: {0}")]
    Backend(String),
}

/// Boxed future alias for allocation results.
pub type AllocationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<NetworkIdentity, AllocationError>> + Send + 'a>>;

/// Assigns a network identity to a task placed on a host.
pub trait NetworkAllocator: Send + Sync {
    fn allocate<'a>(&'a self, task: &'a Task, host_id: &'a str) -> AllocationFuture<'a>;
}

/// Uses the ip/hostname already written in the task file.
///
/// Fails for every host when the task carries no identity, which
/// excludes each candidate in turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAllocator;

impl NetworkAllocator for StaticAllocator {
    fn allocate<'a>(&'a self, task: &'a Task, host_id: &'a str) -> AllocationFuture<'a> {
        Box::pin(async move {
            match (&task.ip, &task.hostname) {
                (Some(ip), Some(hostname)) if !ip.is_empty() && !hostname.is_empty() => {
                    Ok(NetworkIdentity {
                        ip: ip.clone(),
                        hostname: hostname.clone(),
                    })
                }
                _ => Err(AllocationError::Unavailable {
                    task: task.identity(),
                    host: host_id.to_string(),
                }),
            }
        })
    }
}
