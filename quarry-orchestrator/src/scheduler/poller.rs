//! Run poller
//!
//! One invocation of [`RunPoller::poll`] checks the remote status of a run
//! once, records what it saw, and either finishes the run or enqueues the
//! next attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quarry_client::{ClientError, RemoteQuery, RemoteStatus};
use quarry_core::domain::run::{DEFAULT_FAILURE_MESSAGE, RunStatus};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::DelayQueue;
use crate::repository::{RunRepository, StoreError};

/// Arguments of one poll invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTask {
    pub run_id: Uuid,
    pub remote_run_id: String,
    /// Zero for the immediate first poll
    pub attempt: u32,
}

impl PollTask {
    pub fn first(run_id: Uuid, remote_run_id: impl Into<String>) -> Self {
        Self {
            run_id,
            remote_run_id: remote_run_id.into(),
            attempt: 0,
        }
    }

    fn next(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

/// Poll timing and bounds
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between two polls of the same run
    pub poll_interval: Duration,

    /// Follow-up polls after the immediate first one
    pub max_attempts: u32,

    /// Extra tries for a transient explorer failure within one invocation
    pub transport_retries: u32,

    pub transport_retry_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_attempts: 40,
            transport_retries: 2,
            transport_retry_delay: Duration::from_millis(500),
        }
    }
}

impl PollSettings {
    /// Total wall-clock budget spent waiting between polls
    pub fn timeout_budget(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }

    /// Message recorded on runs that exhaust their attempts
    pub fn timeout_message(&self) -> String {
        let secs = self.timeout_budget().as_secs();
        let budget = match secs {
            60 => "1 minute".to_string(),
            s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
            1 => "1 second".to_string(),
            s => format!("{} seconds", s),
        };
        format!("Query timed out after {}", budget)
    }
}

/// What a single invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Results stored, run is `success`
    Succeeded { rows: usize },
    /// Run recorded as `failed`
    Failed { message: String },
    /// Attempts exhausted, run recorded as `failed`
    TimedOut,
    /// Still in progress, next attempt enqueued
    Rescheduled { attempt: u32 },
    /// The run was already terminal; nothing was done
    AlreadyTerminal(RunStatus),
}

/// An invocation that could not complete.
///
/// The run keeps whatever state was last persisted and no follow-up poll is
/// enqueued.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("explorer request failed: {0}")]
    Remote(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives one run per invocation
pub struct RunPoller {
    store: Arc<dyn RunRepository>,
    remote: Arc<dyn RemoteQuery>,
    queue: Arc<dyn DelayQueue>,
    settings: PollSettings,
}

impl RunPoller {
    pub fn new(
        store: Arc<dyn RunRepository>,
        remote: Arc<dyn RemoteQuery>,
        queue: Arc<dyn DelayQueue>,
        settings: PollSettings,
    ) -> Self {
        Self {
            store,
            remote,
            queue,
            settings,
        }
    }

    /// Runs one poll invocation
    pub async fn poll(&self, task: PollTask) -> Result<PollOutcome, PollError> {
        let run = self
            .store
            .find_by_id(task.run_id)
            .await?
            .ok_or(StoreError::NotFound(task.run_id))?;

        // A redelivered task for a finished run
        if run.status.is_terminal() {
            debug!("Run {} already {}, skipping poll", task.run_id, run.status);
            return Ok(PollOutcome::AlreadyTerminal(run.status));
        }

        debug!(
            "Polling run {} (remote {}, attempt {}/{})",
            task.run_id, task.remote_run_id, task.attempt, self.settings.max_attempts
        );

        let status = self
            .with_retry(&task, "status", || {
                self.remote.status(&task.remote_run_id)
            })
            .await?;

        match status {
            RemoteStatus::Success => self.complete(&task).await,
            RemoteStatus::Failed(detail) => {
                let message = detail.unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.into());
                self.fail(&task, message).await
            }
            RemoteStatus::Queued | RemoteStatus::Running => {
                self.store
                    .set_status(task.run_id, RunStatus::Running, None)
                    .await?;
                self.reschedule_or_time_out(task).await
            }
            RemoteStatus::Unknown(raw) => {
                warn!(
                    "Run {} reported unrecognized status {:?}, leaving it as {}",
                    task.run_id, raw, run.status
                );
                self.reschedule_or_time_out(task).await
            }
        }
    }

    async fn complete(&self, task: &PollTask) -> Result<PollOutcome, PollError> {
        let fetched = self
            .with_retry(task, "results", || {
                self.remote.fetch_results(&task.remote_run_id)
            })
            .await;

        match fetched {
            Ok(rows) => {
                let count = rows.len();
                self.store.set_result(task.run_id, rows).await?;
                info!("Run {} succeeded with {} row(s)", task.run_id, count);
                Ok(PollOutcome::Succeeded { rows: count })
            }
            Err(e) if e.is_format() => self.fail(task, e.to_string()).await,
            Err(e) => Err(e.into()),
        }
    }

    async fn fail(&self, task: &PollTask, message: String) -> Result<PollOutcome, PollError> {
        self.store
            .set_status(task.run_id, RunStatus::Failed, Some(message.clone()))
            .await?;
        info!("Run {} failed: {}", task.run_id, message);
        Ok(PollOutcome::Failed { message })
    }

    async fn reschedule_or_time_out(&self, task: PollTask) -> Result<PollOutcome, PollError> {
        if task.attempt < self.settings.max_attempts {
            let next = task.next();
            let attempt = next.attempt;
            self.queue.enqueue(next, self.settings.poll_interval);
            return Ok(PollOutcome::Rescheduled { attempt });
        }

        let message = self.settings.timeout_message();
        self.store
            .set_status(task.run_id, RunStatus::Failed, Some(message))
            .await?;
        info!(
            "Run {} timed out after {} attempt(s)",
            task.run_id,
            task.attempt + 1
        );
        Ok(PollOutcome::TimedOut)
    }

    /// Retries transient explorer failures without consuming an attempt
    async fn with_retry<T, F, Fut>(
        &self,
        task: &PollTask,
        operation: &str,
        mut call: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut retries = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && retries < self.settings.transport_retries => {
                    retries += 1;
                    warn!(
                        "Explorer {} request for run {} failed (retry {}/{}): {}",
                        operation, task.run_id, retries, self.settings.transport_retries, e
                    );
                    tokio::time::sleep(self.settings.transport_retry_delay).await;
                }
                result => return result,
            }
        }
    }
}
