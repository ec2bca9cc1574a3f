//! Run Service
//!
//! Business logic for submitting segment runs and reading them back.

use std::time::Duration;

use quarry_client::{ClientError, RemoteQuery};
use quarry_core::domain::run::{Run, RunStatus};
use quarry_core::domain::segment::{Category, InvalidParameter, UnknownCategory};
use quarry_core::dto::run::{SubmitRun, SubmittedRun};
use thiserror::Error;
use uuid::Uuid;

use crate::repository::{RunRepository, StoreError};
use crate::scheduler::{DelayQueue, PollTask};

/// Runs returned by a listing when the caller gives no limit
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Upper bound on a single listing
pub const MAX_LIST_LIMIT: usize = 100;

/// Service error type
#[derive(Debug, Error)]
pub enum RunError {
    /// Explorer credentials are missing; nothing was created
    #[error("explorer is not configured: {0}")]
    Configuration(ClientError),

    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),

    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),

    /// The explorer rejected the query; the run was recorded as failed
    #[error("submission of run {run_id} failed: {message}")]
    Submission { run_id: Uuid, message: String },

    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("no runs found for category {0}")]
    NoRuns(Category),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create a run, submit its query and schedule the first poll
pub async fn submit_run(
    store: &dyn RunRepository,
    remote: &dyn RemoteQuery,
    queue: &dyn DelayQueue,
    req: SubmitRun,
) -> Result<SubmittedRun, RunError> {
    remote.check_credentials().map_err(RunError::Configuration)?;

    let category: Category = req.category.parse()?;
    let segment = category.segment();
    let query = segment.render(&req.parameters)?;

    let run = store.create(category, segment.label, req.parameters).await?;

    tracing::info!("Run created: {} for segment: {}", run.id, category);

    let remote_run_id = match remote.submit(&query).await {
        Ok(remote_run_id) => remote_run_id,
        Err(e) => {
            let message = e.to_string();
            store
                .set_status(run.id, RunStatus::Failed, Some(message.clone()))
                .await?;
            tracing::warn!("Run {} submission failed: {}", run.id, message);
            return Err(RunError::Submission {
                run_id: run.id,
                message,
            });
        }
    };

    store.attach_remote_run_id(run.id, &remote_run_id).await?;
    queue.enqueue(
        PollTask::first(run.id, remote_run_id.clone()),
        Duration::ZERO,
    );

    tracing::info!("Run {} submitted as remote run {}", run.id, remote_run_id);

    Ok(SubmittedRun {
        run_id: run.id,
        remote_run_id,
    })
}

/// Get a run by ID
pub async fn get_run(store: &dyn RunRepository, id: Uuid) -> Result<Run, RunError> {
    store.find_by_id(id).await?.ok_or(RunError::NotFound(id))
}

/// Most recent run of a category
pub async fn latest_run(store: &dyn RunRepository, category: &str) -> Result<Run, RunError> {
    let category: Category = category.parse()?;

    store
        .latest(category)
        .await?
        .ok_or(RunError::NoRuns(category))
}

/// Newest runs across categories
pub async fn recent_runs(
    store: &dyn RunRepository,
    limit: Option<usize>,
) -> Result<Vec<Run>, RunError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    Ok(store.recent(limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRunRepository;
    use crate::testing::{RecordingQueue, ScriptedRemote};
    use quarry_client::RemoteStatus;
    use serde_json::json;
    use std::collections::HashMap;

    fn request(category: &str, parameters: serde_json::Value) -> SubmitRun {
        SubmitRun {
            category: category.to_string(),
            parameters: serde_json::from_value(parameters).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_submit_creates_run_and_schedules_first_poll() {
        let store = InMemoryRunRepository::new();
        let remote = ScriptedRemote::always(RemoteStatus::Running);
        let queue = RecordingQueue::default();

        let submitted = submit_run(
            &store,
            &remote,
            &queue,
            request("lending_whales", json!({"protocol": "Morpho"})),
        )
        .await
        .unwrap();

        assert_eq!(submitted.remote_run_id, "abc123");

        let run = get_run(&store, submitted.run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.category, Category::LendingWhales);
        assert_eq!(run.label, "Deep Capital Allocators");
        assert_eq!(run.remote_run_id.as_deref(), Some("abc123"));
        assert_eq!(run.parameters["protocol"], "Morpho");

        let queued = queue.take();
        assert_eq!(
            queued,
            vec![(PollTask::first(run.id, "abc123"), Duration::ZERO)]
        );

        let sql = remote.submitted();
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains("Morpho"));
        assert!(!sql[0].contains("{protocol}"));
    }

    #[tokio::test]
    async fn test_missing_credentials_create_nothing() {
        let store = InMemoryRunRepository::new();
        let remote = ScriptedRemote::always(RemoteStatus::Running).without_credentials();
        let queue = RecordingQueue::default();

        let err = submit_run(
            &store,
            &remote,
            &queue,
            request("early_adopter", json!({})),
        )
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Configuration(_)));
        assert!(store.recent(10).await.unwrap().is_empty());
        assert!(queue.take().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_creates_nothing() {
        let store = InMemoryRunRepository::new();
        let remote = ScriptedRemote::always(RemoteStatus::Running);
        let queue = RecordingQueue::default();

        let err = submit_run(&store, &remote, &queue, request("whales", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::UnknownCategory(_)));
        assert!(store.recent(10).await.unwrap().is_empty());
        assert!(remote.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_parameter_creates_nothing() {
        let store = InMemoryRunRepository::new();
        let remote = ScriptedRemote::always(RemoteStatus::Running);
        let queue = RecordingQueue::default();

        let injected = json!({"protocol": "x'; DROP TABLE users; --"});
        let err = submit_run(
            &store,
            &remote,
            &queue,
            request("lending_whales", injected),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::InvalidParameter(_)));
        assert!(store.recent(10).await.unwrap().is_empty());
        assert!(remote.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_submission_marks_run_failed() {
        let store = InMemoryRunRepository::new();
        let remote = ScriptedRemote::always(RemoteStatus::Running).rejecting_submissions(400);
        let queue = RecordingQueue::default();

        let err = submit_run(
            &store,
            &remote,
            &queue,
            request("power_swappers", json!({})),
        )
            .await
            .unwrap_err();

        let (run_id, message) = match err {
            RunError::Submission { run_id, message } => (run_id, message),
            other => panic!("expected a submission error, got {other:?}"),
        };

        let run = get_run(&store, run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message, Some(message));
        assert!(run.remote_run_id.is_none());
        assert!(queue.take().is_empty());
    }

    #[tokio::test]
    async fn test_latest_run_by_category() {
        let store = InMemoryRunRepository::new();
        store
            .create(
                Category::LendingWhales,
                "Deep Capital Allocators",
                HashMap::new(),
            )
            .await
            .unwrap();
        let newest = store
            .create(
                Category::LendingWhales,
                "Deep Capital Allocators",
                HashMap::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            latest_run(&store, "lending_whales").await.unwrap().id,
            newest.id
        );
        assert!(matches!(
            latest_run(&store, "cross_protocol").await,
            Err(RunError::NoRuns(Category::CrossProtocol))
        ));
        assert!(matches!(
            latest_run(&store, "nope").await,
            Err(RunError::UnknownCategory(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_runs_limits() {
        let store = InMemoryRunRepository::new();
        for _ in 0..105 {
            store
                .create(Category::EarlyAdopter, "Base OGs", HashMap::new())
                .await
                .unwrap();
        }

        assert_eq!(
            recent_runs(&store, None).await.unwrap().len(),
            DEFAULT_LIST_LIMIT
        );
        assert_eq!(recent_runs(&store, Some(5)).await.unwrap().len(), 5);
        assert_eq!(
            recent_runs(&store, Some(500)).await.unwrap().len(),
            MAX_LIST_LIMIT
        );
    }

    #[tokio::test]
    async fn test_get_unknown_run() {
        let store = InMemoryRunRepository::new();
        let id = Uuid::new_v4();
        let err = get_run(&store, id).await.unwrap_err();
        assert!(matches!(err, RunError::NotFound(missing) if missing == id));
    }
}
