use std::time::Duration;

use thiserror::Error;

use crate::types::JobStatus;

/// Network-level failure talking to the backend. HTTP error statuses are not
/// transport errors; they are returned to the caller for deliberate
/// assertion.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed: {source}")]
    Other {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Raised by the job poller once the wall-clock budget is exhausted without
/// the job reaching a terminal state.
#[derive(Debug, Error)]
#[error(
    "job {job_id} still {last_status} after {elapsed:?} ({polls} polls, budget {budget:?})"
)]
pub struct PollTimeoutError {
    pub job_id: String,
    pub last_status: JobStatus,
    pub budget: Duration,
    pub elapsed: Duration,
    pub polls: u32,
}

/// Convenience error for test bodies that treat an HTTP status outside an
/// expected set as a hard failure. The HTTP client itself never raises this.
#[derive(Debug, Error)]
#[error("{context}: unexpected HTTP status {status}")]
pub struct UnexpectedStatusError {
    pub context: String,
    pub status: u16,
}

impl UnexpectedStatusError {
    pub fn new(context: impl Into<String>, status: u16) -> Self {
        Self {
            context: context.into(),
            status,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} environment variable is not set")]
    Missing { name: &'static str },
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}
