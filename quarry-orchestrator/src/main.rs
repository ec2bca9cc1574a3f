use std::sync::Arc;

use anyhow::{Context, Result};
use quarry_client::ExplorerClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::repository::{InMemoryRunRepository, PgRunRepository, RunRepository};
use crate::scheduler::{PollWorker, RunPoller, TokioDelayQueue};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarry_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quarry Orchestrator...");

    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;

    if !config.has_credentials() {
        tracing::warn!(
            "EXPLORER_API_KEY or EXPLORER_QUERY_ID not set, submissions will be rejected"
        );
    }

    let store: Arc<dyn RunRepository> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Arc::new(PgRunRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, runs are kept in memory only");
            Arc::new(InMemoryRunRepository::new())
        }
    };

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let remote = Arc::new(ExplorerClient::with_client(config.explorer.clone(), http));

    tracing::info!("Using explorer at {}", remote.base_url());

    // Poll scheduling
    let (queue, receiver) = TokioDelayQueue::new();
    let queue = Arc::new(queue);
    let poller = Arc::new(RunPoller::new(
        store.clone(),
        remote.clone(),
        queue.clone(),
        config.poll.clone(),
    ));
    tokio::spawn(PollWorker::new(poller, receiver, config.max_concurrent_polls).run());

    tracing::info!(
        "Polling every {:?}, giving up after {} attempts",
        config.poll.poll_interval,
        config.poll.max_attempts
    );

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        store,
        remote,
        queue,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
