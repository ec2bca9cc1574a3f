//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod run;
pub mod segment;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use quarry_client::RemoteQuery;
use tower_http::trace::TraceLayer;

use crate::repository::RunRepository;
use crate::scheduler::DelayQueue;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RunRepository>,
    pub remote: Arc<dyn RemoteQuery>,
    pub queue: Arc<dyn DelayQueue>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Segment catalog
        .route("/api/segments", get(segment::list_segments))
        // Run endpoints
        .route("/api/runs", post(run::submit_run).get(run::list_runs))
        .route("/api/runs/latest/{category}", get(run::latest_run))
        .route("/api/runs/{id}", get(run::get_run))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
