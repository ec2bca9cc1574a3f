//! Run Repository
//!
//! Postgres-backed run store.

use std::collections::HashMap;

use async_trait::async_trait;
use quarry_core::domain::run::{DEFAULT_FAILURE_MESSAGE, Row, Run, RunStatus};
use quarry_core::domain::segment::Category;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RunRepository, StoreError, source_statuses};

const RUN_COLUMNS: &str =
    "id, category, label, remote_run_id, status, parameters, result, error_message, created_at";

/// Run store on top of a Postgres pool
#[derive(Debug, Clone)]
pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM segment_runs WHERE id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Turns "no row updated" into either a rejected transition or NotFound
    async fn applied(&self, id: Uuid, rows_affected: u64) -> Result<bool, StoreError> {
        if rows_affected > 0 {
            return Ok(true);
        }

        if self.exists(id).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound(id))
        }
    }
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn create(
        &self,
        category: Category,
        label: &str,
        parameters: HashMap<String, serde_json::Value>,
    ) -> Result<Run, StoreError> {
        let run = Run::new(category, label, parameters);
        let parameters = serde_json::to_value(&run.parameters)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO segment_runs (id, category, label, status, parameters, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run.id)
        .bind(category.as_str())
        .bind(&run.label)
        .bind(run.status.as_str())
        .bind(parameters)
        .bind(run.created_at)
        .execute(&self.pool)
        .await?;

        Ok(run)
    }

    async fn attach_remote_run_id(
        &self,
        id: Uuid,
        remote_run_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE segment_runs
            SET remote_run_id = $1
            WHERE id = $2 AND remote_run_id IS NULL
            "#,
        )
        .bind(remote_run_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.applied(id, result.rows_affected()).await
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

        let error_message = match (status, error_message) {
            (RunStatus::Failed, Some(message)) => Some(message),
            (RunStatus::Failed, None) => Some(DEFAULT_FAILURE_MESSAGE.to_string()),
            _ => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE segment_runs
            SET status = $1, error_message = $2
            WHERE id = $3 AND status = ANY($4)
            "#,
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(id)
        .bind(source_statuses(status))
        .execute(&self.pool)
        .await?;

        self.applied(id, result.rows_affected()).await
    }

    async fn set_result(&self, id: Uuid, rows: Vec<Row>) -> Result<bool, StoreError> {
        let rows: Vec<_> = rows.into_iter().map(serde_json::Value::Object).collect();
        let rows = serde_json::Value::Array(rows);

        let result = sqlx::query(
            r#"
            UPDATE segment_runs
            SET status = $1, result = $2, error_message = NULL
            WHERE id = $3 AND status = ANY($4)
            "#,
        )
        .bind(RunStatus::Success.as_str())
        .bind(rows)
        .bind(id)
        .bind(source_statuses(RunStatus::Success))
        .execute(&self.pool)
        .await?;

        self.applied(id, result.rows_affected()).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Run>, StoreError> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM segment_runs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Run::try_from).transpose()
    }

    async fn latest(&self, category: Category) -> Result<Option<Run>, StoreError> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM segment_runs WHERE category = $1 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Run::try_from).transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Run>, StoreError> {
        let rows = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM segment_runs ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Run::try_from).collect()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    category: String,
    label: String,
    remote_run_id: Option<String>,
    status: String,
    parameters: serde_json::Value,
    result: Option<serde_json::Value>,
    error_message: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<RunRow> for Run {
    type Error = StoreError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse::<Category>()
            .map_err(|e| StoreError::Corrupt(format!("run {}: {}", row.id, e)))?;
        let status = row
            .status
            .parse::<RunStatus>()
            .map_err(|e| StoreError::Corrupt(format!("run {}: {}", row.id, e)))?;

        let parameters = serde_json::from_value(row.parameters)
            .map_err(|e| StoreError::Corrupt(format!("run {} parameters: {}", row.id, e)))?;
        let result = row
            .result
            .map(serde_json::from_value::<Vec<Row>>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("run {} result: {}", row.id, e)))?;

        Ok(Run {
            id: row.id,
            category,
            label: row.label,
            remote_run_id: row.remote_run_id,
            status,
            parameters,
            result,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(category: &str, status: &str) -> RunRow {
        RunRow {
            id: Uuid::new_v4(),
            category: category.to_string(),
            label: "Deep Capital Allocators".to_string(),
            remote_run_id: Some("abc123".to_string()),
            status: status.to_string(),
            parameters: json!({"protocol": "Morpho"}),
            result: Some(json!([{"wallet_address": "0x1", "deposit_count": 4}])),
            error_message: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_row_converts_to_run() {
        let run = Run::try_from(row("lending_whales", "success")).unwrap();
        assert_eq!(run.category, Category::LendingWhales);
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.parameters["protocol"], "Morpho");
        assert_eq!(run.row_count(), Some(1));
    }

    #[test]
    fn test_unknown_category_is_corrupt() {
        let err = Run::try_from(row("whales", "pending")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));

        let err = Run::try_from(row("lending_whales", "done")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    /// Needs a scratch Postgres: `DATABASE_URL=... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_conditional_updates_against_postgres() {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = crate::db::create_pool(&database_url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let store = PgRunRepository::new(pool);

        let run = store
            .create(
                Category::LendingWhales,
                "Deep Capital Allocators",
                HashMap::new(),
            )
            .await
            .unwrap();
        assert!(store.attach_remote_run_id(run.id, "abc123").await.unwrap());
        assert!(!store.attach_remote_run_id(run.id, "zzz999").await.unwrap());

        let running = store.set_status(run.id, RunStatus::Running, None);
        assert!(running.await.unwrap());
        let backwards = store.set_status(run.id, RunStatus::Pending, None);
        assert!(!backwards.await.unwrap());

        let mut row = Row::new();
        row.insert("wallet_address".to_string(), json!("0x1"));
        assert!(store.set_result(run.id, vec![row]).await.unwrap());
        let overwrite = store.set_status(run.id, RunStatus::Failed, None);
        assert!(!overwrite.await.unwrap());
        assert!(!store.set_result(run.id, Vec::new()).await.unwrap());

        let stored = store.find_by_id(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Success);
        assert_eq!(stored.remote_run_id.as_deref(), Some("abc123"));
        assert_eq!(stored.row_count(), Some(1));
        assert!(stored.error_message.is_none());

        let missing = store.set_status(Uuid::new_v4(), RunStatus::Failed, None).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }
}
