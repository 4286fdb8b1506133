//! Scheduler error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Class of a failed attempt or of a terminal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DecodeFailure,
    NoMatchingHost,
    NetworkAllocationFailed,
    TransportFailure,
    StaleVersionToken,
    RetryBudgetExhausted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::DecodeFailure => "decode failure",
            FailureKind::NoMatchingHost => "no matching host",
            FailureKind::NetworkAllocationFailed => "network allocation failed",
            FailureKind::TransportFailure => "transport failure",
            FailureKind::StaleVersionToken => "transition rejected",
            FailureKind::RetryBudgetExhausted => "retry budget exhausted",
        };
        f.write_str(label)
    }
}

/// One failed attempt within a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub attempt: u32,
    pub kind: FailureKind,
    /// Host the attempt had selected, if it got that far.
    pub host: Option<String>,
    pub reason: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt {}: {}", self.attempt, self.kind)?;
        if let Some(host) = &self.host {
            write!(f, " on {host}")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Terminal errors of a scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("cluster state could not be decoded: {0}")]
    Decode(String),

    #[error("retry budget exhausted after {attempts} attempts, last {}", last_failure(.failures))]
    RetryBudgetExhausted {
        attempts: u32,
        failures: Vec<AttemptFailure>,
    },

    /// A single-shot operation failed without a retry loop around it.
    #[error("{0}")]
    Failed(AttemptFailure),

    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid task: {0}")]
    InvalidTask(String),
}

impl ScheduleError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScheduleError::Decode(_) => FailureKind::DecodeFailure,
            ScheduleError::RetryBudgetExhausted { .. } => FailureKind::RetryBudgetExhausted,
            ScheduleError::Failed(failure) => failure.kind,
            ScheduleError::InvalidConfig(_) | ScheduleError::InvalidTask(_) => {
                FailureKind::DecodeFailure
            }
        }
    }

    /// Failure class of the final attempt of an exhausted run.
    pub fn last_attempt_kind(&self) -> Option<FailureKind> {
        match self {
            ScheduleError::RetryBudgetExhausted { failures, .. } => failures.last().map(|f| f.kind),
            _ => None,
        }
    }
}

fn last_failure(failures: &[AttemptFailure]) -> String {
    failures
        .last()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_error_names_last_failure() {
        let err = ScheduleError::RetryBudgetExhausted {
            attempts: 2,
            failures: vec![
                AttemptFailure {
                    attempt: 1,
                    kind: FailureKind::TransportFailure,
                    host: None,
                    reason: "connection refused".to_string(),
                },
                AttemptFailure {
                    attempt: 2,
                    kind: FailureKind::NoMatchingHost,
                    host: None,
                    reason: "no matching host among 1 hosts".to_string(),
                },
            ],
        };
        assert_eq!(err.kind(), FailureKind::RetryBudgetExhausted);
        assert_eq!(err.last_attempt_kind(), Some(FailureKind::NoMatchingHost));
        let text = err.to_string();
        assert!(text.contains("after 2 attempts"));
        assert!(text.contains("attempt 2: no matching host"));
    }

    #[test]
    fn attempt_failure_mentions_host() {
        let failure = AttemptFailure {
            attempt: 1,
            kind: FailureKind::NetworkAllocationFailed,
            host: Some("h1".to_string()),
            reason: "pool empty".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "attempt 1: network allocation failed on h1: pool empty"
        );
    }
}
