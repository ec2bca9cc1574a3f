//! Segment run domain types

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::segment::Category;

/// A single result row: column name to scalar value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Segment run record
///
/// Created as `Pending` when a query is submitted and moved forward by the
/// poll scheduler until it reaches `Success` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub category: Category,
    pub label: String,
    pub remote_run_id: Option<String>,
    pub status: RunStatus,
    pub parameters: HashMap<String, serde_json::Value>,
    pub result: Option<Vec<Row>>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Run {
    /// Creates a fresh pending run
    pub fn new(
        category: Category,
        label: impl Into<String>,
        parameters: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            label: label.into(),
            remote_run_id: None,
            status: RunStatus::Pending,
            parameters,
            result: None,
            error_message: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Number of result rows, if the run succeeded
    pub fn row_count(&self) -> Option<usize> {
        self.result.as_ref().map(Vec::len)
    }

    /// Applies a status transition in place.
    ///
    /// Returns `false` and leaves the run untouched when the transition is not
    /// allowed (terminal runs never change).
    pub fn apply_status(&mut self, status: RunStatus, error_message: Option<String>) -> bool {
        if !self.status.can_transition_to(status) || status == RunStatus::Success {
            return false;
        }

        self.status = status;
        self.error_message = match (status, error_message) {
            (RunStatus::Failed, Some(message)) => Some(message),
            (RunStatus::Failed, None) => Some(DEFAULT_FAILURE_MESSAGE.to_string()),
            _ => None,
        };
        true
    }

    /// Marks the run successful with its rows.
    ///
    /// Returns `false` when the run is already terminal.
    pub fn apply_result(&mut self, rows: Vec<Row>) -> bool {
        if !self.status.can_transition_to(RunStatus::Success) {
            return false;
        }

        self.status = RunStatus::Success;
        self.result = Some(rows);
        self.error_message = None;
        true
    }
}

/// Message recorded when a run fails without any detail
pub const DEFAULT_FAILURE_MESSAGE: &str = "Query execution failed";

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }

    /// True once the run can no longer change
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }

    /// Forward-only transition table.
    ///
    /// Re-applying the current non-terminal status is allowed so that
    /// repeated `running` updates stay idempotent.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        match (self, next) {
            (RunStatus::Pending, _) => true,
            (RunStatus::Running, RunStatus::Pending) => false,
            (RunStatus::Running, _) => true,
            (RunStatus::Success | RunStatus::Failed, _) => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown run status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RunStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(wallet: &str) -> Row {
        let mut row = Row::new();
        row.insert("wallet_address".to_string(), serde_json::json!(wallet));
        row
    }

    #[test]
    fn test_terminal_states_never_transition() {
        for terminal in [RunStatus::Success, RunStatus::Failed] {
            for next in [
                RunStatus::Pending,
                RunStatus::Running,
                RunStatus::Success,
                RunStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_running_cannot_go_back_to_pending() {
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Success));
    }

    #[test]
    fn test_apply_result_ignored_on_terminal_run() {
        let mut run = Run::new(
            Category::LendingWhales,
            "Deep Capital Allocators",
            HashMap::new(),
        );
        assert!(run.apply_status(RunStatus::Failed, Some("boom".to_string())));

        assert!(!run.apply_result(vec![row("0xabc")]));
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.result.is_none());
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failed_without_message_uses_default() {
        let mut run = Run::new(Category::EarlyAdopter, "Base OGs", HashMap::new());
        assert!(run.apply_status(RunStatus::Failed, None));
        assert_eq!(run.error_message.as_deref(), Some(DEFAULT_FAILURE_MESSAGE));
    }

    #[test]
    fn test_success_only_via_result() {
        let mut run = Run::new(
            Category::PowerSwappers,
            "High-Velocity Traders",
            HashMap::new(),
        );
        assert!(!run.apply_status(RunStatus::Success, None));
        assert_eq!(run.status, RunStatus::Pending);

        assert!(run.apply_result(vec![row("0x1"), row("0x2")]));
        assert_eq!(run.row_count(), Some(2));
        assert!(run.error_message.is_none());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("running".parse::<RunStatus>().unwrap(), RunStatus::Running);
        assert!("done".parse::<RunStatus>().is_err());
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }
}
