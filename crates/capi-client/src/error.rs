//! HTTP client errors.

use std::time::Duration;

use thiserror::Error;

use capi_scheduler::AllocationError;
use capi_state::ControlPlaneError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("response from {url} could not be decoded: {reason}")]
    Decode { url: String, reason: String },

    #[error("request body could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ClientError> for ControlPlaneError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Decode { .. } => ControlPlaneError::Decode(err.to_string()),
            ClientError::Status { status, .. } => ControlPlaneError::Transport {
                status: Some(status),
                message: err.to_string(),
            },
            other => ControlPlaneError::transport(other.to_string()),
        }
    }
}

impl From<ClientError> for AllocationError {
    fn from(err: ClientError) -> Self {
        AllocationError::Backend(err.to_string())
    }
}
