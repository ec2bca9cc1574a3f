//! Scripted collaborators for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quarry_client::{ClientError, RemoteQuery, RemoteStatus, Result};
use quarry_core::domain::run::Row;
use serde_json::json;

use crate::scheduler::{DelayQueue, PollTask};

/// `n` rows shaped like a segment result
pub fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("wallet_address".to_string(), json!(format!("0x{i:040x}")));
            row.insert("deposit_count".to_string(), json!(i + 1));
            row
        })
        .collect()
}

enum Results {
    Rows(Vec<Row>),
    Malformed,
}

/// Explorer double that answers status checks from a script.
///
/// Each step is either a status or an HTTP error code. Once the script runs
/// out every check answers the fallback status.
pub struct ScriptedRemote {
    steps: Mutex<VecDeque<std::result::Result<RemoteStatus, u16>>>,
    fallback: RemoteStatus,
    results: Mutex<Results>,
    submit: Mutex<std::result::Result<String, u16>>,
    credentials: bool,
    status_calls: AtomicUsize,
    status_delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    submitted: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub fn with_steps(
        steps: impl IntoIterator<Item = std::result::Result<RemoteStatus, u16>>,
    ) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback: RemoteStatus::Running,
            results: Mutex::new(Results::Rows(Vec::new())),
            submit: Mutex::new(Ok("abc123".to_string())),
            credentials: true,
            status_calls: AtomicUsize::new(0),
            status_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = RemoteStatus>) -> Self {
        Self::with_steps(statuses.into_iter().map(Ok))
    }

    pub fn always(status: RemoteStatus) -> Self {
        Self::with_steps(Vec::new()).falling_back_to(status)
    }

    pub fn falling_back_to(mut self, status: RemoteStatus) -> Self {
        self.fallback = status;
        self
    }

    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        *self.results.lock().unwrap() = Results::Rows(rows);
        self
    }

    pub fn with_malformed_results(self) -> Self {
        *self.results.lock().unwrap() = Results::Malformed;
        self
    }

    /// Makes `submit` fail with the given HTTP status
    pub fn rejecting_submissions(self, status: u16) -> Self {
        *self.submit.lock().unwrap() = Err(status);
        self
    }

    /// Makes every status check take `delay`
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Most status checks that were ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// SQL text of every submission, in order
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteQuery for ScriptedRemote {
    fn check_credentials(&self) -> Result<()> {
        if self.credentials {
            Ok(())
        } else {
            Err(ClientError::MissingCredentials("EXPLORER_API_KEY"))
        }
    }

    async fn submit(&self, sql_query: &str) -> Result<String> {
        self.check_credentials()?;
        self.submitted.lock().unwrap().push(sql_query.to_string());
        match &*self.submit.lock().unwrap() {
            Ok(id) => Ok(id.clone()),
            Err(status) => Err(ClientError::api_error(*status, "query rejected")),
        }
    }

    async fn status(&self, _remote_run_id: &str) -> Result<RemoteStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        let step = self.steps.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Some(Ok(status)) => Ok(status),
            Some(Err(code)) => Err(ClientError::api_error(code, "scripted failure")),
            None => Ok(self.fallback.clone()),
        }
    }

    async fn fetch_results(&self, _remote_run_id: &str) -> Result<Vec<Row>> {
        match &*self.results.lock().unwrap() {
            Results::Rows(rows) => Ok(rows.clone()),
            Results::Malformed => Err(ClientError::Format(
                "results payload is neither an array nor an object".to_string(),
            )),
        }
    }
}

/// Delay queue that only records what was enqueued
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<(PollTask, Duration)>>,
}

impl RecordingQueue {
    /// Drains everything enqueued so far
    pub fn take(&self) -> Vec<(PollTask, Duration)> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

impl DelayQueue for RecordingQueue {
    fn enqueue(&self, task: PollTask, delay: Duration) {
        self.tasks.lock().unwrap().push((task, delay));
    }
}
