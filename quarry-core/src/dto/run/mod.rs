//! Run DTOs for the orchestrator API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::run::{Run, RunStatus};
use crate::domain::segment::Category;

/// Request to submit a new segment run
///
/// `category` stays a plain string so that an unknown key can be reported
/// as such instead of as a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRun {
    pub category: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// Identifiers of a freshly submitted run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedRun {
    pub run_id: Uuid,
    pub remote_run_id: String,
}

/// Run summary for list views (result rows omitted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: Uuid,
    pub category: Category,
    pub label: String,
    pub status: RunStatus,
    pub remote_run_id: Option<String>,
    pub row_count: Option<usize>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Run> for RunSummary {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id,
            category: run.category,
            label: run.label.clone(),
            status: run.status,
            remote_run_id: run.remote_run_id.clone(),
            row_count: run.row_count(),
            error_message: run.error_message.clone(),
            created_at: run.created_at,
        }
    }
}
