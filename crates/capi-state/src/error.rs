//! Error types for snapshot construction and control-plane access.

use thiserror::Error;

use capi_core::{DecodeError, ResourceError};

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// A cluster state that cannot be compacted into a snapshot.
///
/// Always fatal for the whole snapshot; no partial result is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("workload {workload} overdraws host {host}: {source}")]
    Overdrawn {
        host: String,
        workload: String,
        source: ResourceError,
    },
}

/// Failures talking to the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    /// Unreachable, timed out, or answered with a non-success status.
    #[error("control plane transport failure{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// A success response whose body could not be parsed.
    #[error("control plane response could not be decoded: {0}")]
    Decode(String),
}

impl ControlPlaneError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }
}
