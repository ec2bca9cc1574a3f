//! Repository Module
//!
//! Persistence of segment runs. [`RunRepository`] is the store contract the
//! services and the poll scheduler depend on; Postgres backs it in production
//! and the in-memory implementation backs tests and credential-less local runs.

pub mod memory;
pub mod run;

use std::collections::HashMap;

use async_trait::async_trait;
use quarry_core::domain::run::{Row, Run, RunStatus};
use quarry_core::domain::segment::Category;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryRunRepository;
pub use run::PgRunRepository;

/// Storage-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("run {0} not found")]
    NotFound(Uuid),

    /// `success` is only reachable through `set_result`
    #[error("run {0} can only succeed with a result")]
    ResultRequired(Uuid),

    #[error("corrupt run record: {0}")]
    Corrupt(String),
}

/// Run store contract
///
/// Every mutation is atomic per record. Status changes only move forward:
/// calls that would leave a terminal state, or move a `running` run back to
/// `pending`, are accepted and ignored (they return `false`).
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Persists a new `pending` run
    async fn create(
        &self,
        category: Category,
        label: &str,
        parameters: HashMap<String, serde_json::Value>,
    ) -> Result<Run, StoreError>;

    /// Records the remote run id. An id that is already set is never
    /// overwritten.
    async fn attach_remote_run_id(&self, id: Uuid, remote_run_id: &str)
    -> Result<bool, StoreError>;

    /// Moves the run to `status`. `failed` without a message records the
    /// default failure message.
    async fn set_status(
        &self,
        id: Uuid,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<bool, StoreError>;

    /// Marks the run `success` and attaches its rows in one step
    async fn set_result(&self, id: Uuid, rows: Vec<Row>) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Run>, StoreError>;

    /// Most recently created run of a category
    async fn latest(&self, category: Category) -> Result<Option<Run>, StoreError>;

    /// Most recent runs across categories, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<Run>, StoreError>;
}

/// Statuses a run may currently be in for a move to `next` to apply
fn source_statuses(next: RunStatus) -> Vec<String> {
    [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Success,
        RunStatus::Failed,
    ]
    .into_iter()
    .filter(|current| current.can_transition_to(next))
    .map(|current| current.as_str().to_string())
    .collect()
}
