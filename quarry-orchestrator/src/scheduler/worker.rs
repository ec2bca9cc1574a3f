//! Poll worker
//!
//! Drains due poll tasks and runs each one in its own task, bounded by a
//! semaphore.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tracing::{debug, error, info};

use super::{PollTask, RunPoller};

/// Executes poll tasks as they come due
pub struct PollWorker {
    poller: Arc<RunPoller>,
    receiver: mpsc::UnboundedReceiver<PollTask>,
    semaphore: Arc<Semaphore>,
}

impl PollWorker {
    pub fn new(
        poller: Arc<RunPoller>,
        receiver: mpsc::UnboundedReceiver<PollTask>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            poller,
            receiver,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Runs until every queue handle has been dropped
    pub async fn run(mut self) {
        info!(
            "Starting poll worker (max concurrent polls: {})",
            self.semaphore.available_permits()
        );

        while let Some(task) = self.receiver.recv().await {
            // Waits for a free slot instead of dropping the task
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                break;
            };
            self.spawn_poll(task, permit);
        }

        info!("Poll queue closed, worker stopping");
    }

    fn spawn_poll(&self, task: PollTask, permit: OwnedSemaphorePermit) {
        let poller = Arc::clone(&self.poller);

        tokio::spawn(async move {
            // Held until the poll finishes
            let _permit = permit;
            let run_id = task.run_id;
            match poller.poll(task).await {
                Ok(outcome) => debug!("Poll of run {} finished: {:?}", run_id, outcome),
                Err(e) => error!("Poll of run {} aborted: {}", run_id, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRunRepository, RunRepository};
    use crate::scheduler::{DelayQueue, PollSettings, TokioDelayQueue};
    use crate::testing::{ScriptedRemote, rows};
    use quarry_client::RemoteStatus;
    use quarry_core::domain::run::RunStatus;
    use quarry_core::domain::segment::Category;
    use std::collections::HashMap;
    use std::time::Duration;

    #[tokio::test]
    async fn test_worker_drives_run_to_success() {
        let store = Arc::new(InMemoryRunRepository::new());
        let remote = Arc::new(
            ScriptedRemote::with_statuses([
                RemoteStatus::Queued,
                RemoteStatus::Running,
                RemoteStatus::Success,
            ])
            .with_rows(rows(4)),
        );
        let (queue, receiver) = TokioDelayQueue::new();
        let queue = Arc::new(queue);
        let settings = PollSettings {
            poll_interval: Duration::from_millis(10),
            ..PollSettings::default()
        };
        let poller = Arc::new(RunPoller::new(
            store.clone(),
            remote.clone(),
            queue.clone(),
            settings,
        ));
        tokio::spawn(PollWorker::new(poller, receiver, 4).run());

        let run = store
            .create(
                Category::PowerSwappers,
                "High-Velocity Traders",
                HashMap::new(),
            )
            .await
            .unwrap();
        store.attach_remote_run_id(run.id, "abc123").await.unwrap();
        queue.enqueue(PollTask::first(run.id, "abc123"), Duration::ZERO);

        let finished = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let run = store.find_by_id(run.id).await.unwrap().unwrap();
                if run.status.is_terminal() {
                    return run;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(finished.status, RunStatus::Success);
        assert_eq!(finished.row_count(), Some(4));
        assert_eq!(remote.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_worker_caps_concurrent_polls() {
        let store = Arc::new(InMemoryRunRepository::new());
        let remote = Arc::new(
            ScriptedRemote::always(RemoteStatus::Success)
                .with_rows(rows(1))
                .with_status_delay(Duration::from_millis(50)),
        );
        let (queue, receiver) = TokioDelayQueue::new();
        let queue = Arc::new(queue);
        let poller = Arc::new(RunPoller::new(
            store.clone(),
            remote.clone(),
            queue.clone(),
            PollSettings::default(),
        ));
        tokio::spawn(PollWorker::new(poller, receiver, 2).run());

        let mut ids = Vec::new();
        for _ in 0..6 {
            let run = store
                .create(Category::EarlyAdopter, "Base OGs", HashMap::new())
                .await
                .unwrap();
            store.attach_remote_run_id(run.id, "abc123").await.unwrap();
            queue.enqueue(PollTask::first(run.id, "abc123"), Duration::ZERO);
            ids.push(run.id);
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            for id in &ids {
                loop {
                    let run = store.find_by_id(*id).await.unwrap().unwrap();
                    if run.status.is_terminal() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(remote.status_calls(), 6);
        let peak = remote.peak_in_flight();
        assert!(peak <= 2, "{peak} polls ran at once with a cap of 2");
    }
}
