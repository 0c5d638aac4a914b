use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::error::{PollTimeoutError, TransportError};
use crate::types::{Job, JobStatus};

/// One observation of a job's status endpoint.
#[derive(Clone, Debug)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub error: Option<String>,
    /// Raw status response; becomes the job's result payload once terminal.
    pub raw: Value,
}

/// Seam between the poller and whatever serves job status, so the loop is
/// backend-agnostic and unit-testable with scripted sources.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn job_snapshot(&self, job_id: &str) -> Result<JobSnapshot, TransportError>;
}

#[derive(Clone, Copy, Debug)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Polls `source` until the job reaches a terminal state, sleeping `interval`
/// between observations. The budget is tracked against a monotonic clock, not
/// an iteration count. A transport failure or an unrecognized status is
/// transient: it is logged and the loop keeps going until the budget runs
/// out. `Failed` is a successful poll; the caller decides what a failed job
/// means for the test.
pub async fn await_completion(
    source: &(impl StatusSource + ?Sized),
    job_id: &str,
    options: &PollOptions,
) -> Result<Job, PollTimeoutError> {
    let started = Instant::now();
    let mut last_status = JobStatus::Unknown;
    let mut polls: u32 = 0;

    loop {
        // Budget check happens before the fetch, so a job observed terminal
        // just under the budget completes instead of timing out.
        if started.elapsed() >= options.max_wait {
            return Err(PollTimeoutError {
                job_id: job_id.to_string(),
                last_status,
                budget: options.max_wait,
                elapsed: started.elapsed(),
                polls,
            });
        }

        polls += 1;
        match source.job_snapshot(job_id).await {
            Ok(snapshot) => {
                last_status = snapshot.status;
                if snapshot.status.is_terminal() {
                    return Ok(Job {
                        job_id: job_id.to_string(),
                        status: snapshot.status,
                        result: snapshot.raw,
                        error: snapshot.error,
                        elapsed: started.elapsed(),
                        polls,
                    });
                }
                tracing::debug!(%job_id, status = %snapshot.status, "job still in flight");
            }
            Err(err) => {
                tracing::warn!(%job_id, "transient status fetch failure: {err}");
            }
        }

        sleep(options.interval).await;
    }
}
