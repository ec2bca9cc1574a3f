use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS segment_runs (
            id UUID PRIMARY KEY,
            category VARCHAR(64) NOT NULL,
            label TEXT NOT NULL,
            remote_run_id VARCHAR(255),
            status VARCHAR(20) NOT NULL,
            parameters JSONB NOT NULL DEFAULT '{}',
            result JSONB,
            error_message TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // "latest per category" lookups
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_segment_runs_category
        ON segment_runs(category, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_segment_runs_created_at
        ON segment_runs(created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_segment_runs_status ON segment_runs(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
