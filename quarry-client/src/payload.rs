//! Explorer payload normalization
//!
//! The explorer is inconsistent about response shapes: the status endpoint
//! may answer with a bare string (sometimes not even valid JSON) or with an
//! object, and the results endpoint with a bare array or a `{ "data": [...] }`
//! envelope. Everything is funneled into the types below.

use quarry_core::domain::run::Row;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Normalized remote run status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Running,
    Success,
    /// Remote reported `failed` or `error`, with its detail if any
    Failed(Option<String>),
    /// Anything the explorer reports that we do not recognize
    Unknown(String),
}

impl RemoteStatus {
    fn from_state(state: &str, error: Option<String>) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "queued" => RemoteStatus::Queued,
            "running" => RemoteStatus::Running,
            "success" => RemoteStatus::Success,
            "failed" | "error" => RemoteStatus::Failed(error),
            _ => RemoteStatus::Unknown(state.to_string()),
        }
    }
}

/// Decodes a raw response body.
///
/// Bodies that are not valid JSON are treated as bare strings with any
/// surrounding quotes stripped.
pub fn decode_body(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let trimmed = text.trim();
            let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
            let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
            Value::String(trimmed.to_string())
        }
    }
}

/// Normalizes a status payload
pub fn parse_status(value: &Value) -> RemoteStatus {
    match value {
        Value::String(state) => RemoteStatus::from_state(state, None),
        Value::Object(map) => {
            let state = map
                .get("state")
                .and_then(Value::as_str)
                .or_else(|| map.get("status").and_then(Value::as_str));

            let error = match map.get("error") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s.is_empty() => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            };

            match state {
                Some(state) => RemoteStatus::from_state(state, error),
                None => RemoteStatus::Unknown(value.to_string()),
            }
        }
        other => RemoteStatus::Unknown(other.to_string()),
    }
}

/// Normalizes a results payload into rows
pub fn parse_rows(value: Value) -> Result<Vec<Row>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ClientError::Format(format!(
                    "expected `data` to be an array, got {}",
                    kind(&other)
                )));
            }
        },
        other => {
            return Err(ClientError::Format(format!(
                "expected an array of rows, got {}",
                kind(&other)
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(ClientError::Format(format!(
                "row {} is {}, expected an object",
                index,
                kind(&other)
            ))),
        })
        .collect()
}

/// Extracts the run id from a submission payload
pub fn parse_run_id(value: &Value) -> Result<String> {
    match value.get("run_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ClientError::Format(format!(
            "submission response has no run_id: {}",
            value
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
