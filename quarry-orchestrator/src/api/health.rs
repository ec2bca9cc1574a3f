//! Health Check API Handler
//!
//! Liveness plus a hint on whether submissions can succeed.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub explorer_configured: bool,
}

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        explorer_configured: state.remote.check_credentials().is_ok(),
    })
}
