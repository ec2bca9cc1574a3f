//! In-memory run store

use std::collections::HashMap;

use async_trait::async_trait;
use quarry_core::domain::run::{Row, Run, RunStatus};
use quarry_core::domain::segment::Category;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RunRepository, StoreError};

/// Run store kept in process memory.
///
/// Runs are held in creation order, so the newest run is always last.
#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<Vec<Run>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Run) -> bool + Send,
    {
        let mut runs = self.runs.write().await;
        let run = runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;

        Ok(apply(run))
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn create(
        &self,
        category: Category,
        label: &str,
        parameters: HashMap<String, serde_json::Value>,
    ) -> Result<Run, StoreError> {
        let mut runs = self.runs.write().await;

        // Stamp under the lock so creation order and timestamps agree
        let mut run = Run::new(category, label, parameters);
        run.created_at = chrono::Utc::now();
        runs.push(run.clone());

        Ok(run)
    }

    async fn attach_remote_run_id(
        &self,
        id: Uuid,
        remote_run_id: &str,
    ) -> Result<bool, StoreError> {
        self.update(id, |run| {
            if run.remote_run_id.is_some() {
                return false;
            }
            run.remote_run_id = Some(remote_run_id.to_string());
            true
        })
        .await
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<bool, StoreError> {
        if status == RunStatus::Success {
            return Err(StoreError::ResultRequired(id));
        }

        self.update(id, |run| run.apply_status(status, error_message))
            .await
    }

    async fn set_result(&self, id: Uuid, rows: Vec<Row>) -> Result<bool, StoreError> {
        self.update(id, |run| run.apply_result(rows)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Run>, StoreError> {
        let runs = self.runs.read().await;
        Ok(runs.iter().find(|r| r.id == id).cloned())
    }

    async fn latest(&self, category: Category) -> Result<Option<Run>, StoreError> {
        let runs = self.runs.read().await;
        Ok(runs.iter().rev().find(|r| r.category == category).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Run>, StoreError> {
        let runs = self.runs.read().await;
        Ok(runs.iter().rev().take(limit).cloned().collect())
    }
}
