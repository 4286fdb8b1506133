//! Error types for resource decoding and arithmetic.

use thiserror::Error;

use crate::resources::Dimension;

/// Raw resource data that could not be turned into a [`ResourceVector`](crate::ResourceVector).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("computing resources missing for {0}")]
    Missing(String),

    #[error("malformed computing resources for {context}: {reason}")]
    Malformed { context: String, reason: String },
}

/// Errors raised by resource arithmetic under the strict policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("resource underflow on {dimension}: have {have}, deducting {deduct}")]
    Underflow {
        dimension: Dimension,
        have: i64,
        deduct: i64,
    },
}
