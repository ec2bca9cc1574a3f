//! Delayed task queue

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use super::PollTask;

/// Accepts a poll task and delivers it for execution once `delay` elapsed.
///
/// Delivery is at least once: consumers must tolerate seeing a task again.
pub trait DelayQueue: Send + Sync {
    fn enqueue(&self, task: PollTask, delay: Duration);
}

/// In-process delay queue on tokio timers.
///
/// Due tasks are pushed onto an unbounded channel that a
/// [`super::PollWorker`] drains.
#[derive(Debug, Clone)]
pub struct TokioDelayQueue {
    sender: mpsc::UnboundedSender<PollTask>,
}

impl TokioDelayQueue {
    /// Creates the queue and the receiving end for the worker
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PollTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DelayQueue for TokioDelayQueue {
    fn enqueue(&self, task: PollTask, delay: Duration) {
        if delay.is_zero() {
            if let Err(e) = self.sender.send(task) {
                warn!("Poll queue closed, dropping poll of run {}", e.0.run_id);
            }
            return;
        }

        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sender.send(task) {
                warn!("Poll queue closed, dropping poll of run {}", e.0.run_id);
            }
        });
    }
}
