//! API client module
//!
//! HTTP client for communicating with the Quarry orchestrator API.

use anyhow::{Context, Result};
use quarry_core::domain::run::Run;
use quarry_core::dto::run::{RunSummary, SubmitRun, SubmittedRun};
use quarry_core::dto::segment::SegmentInfo;
use reqwest::Client;
use uuid::Uuid;

/// HTTP client for the Quarry orchestrator API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// List the segment catalog
    pub async fn list_segments(&self) -> Result<Vec<SegmentInfo>> {
        let url = format!("{}/api/segments", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list segments request")?;

        self.handle_response(response).await
    }

    /// Submit a new segment run
    ///
    /// # Arguments
    /// * `req` - Category and parameters of the run
    ///
    /// # Returns
    /// The local and remote identifiers of the run
    pub async fn submit_run(&self, req: SubmitRun) -> Result<SubmittedRun> {
        let url = format!("{}/api/runs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to send submit run request")?;

        self.handle_response(response).await
    }

    /// Get a run by ID
    pub async fn get_run(&self, id: Uuid) -> Result<Run> {
        let url = format!("{}/api/runs/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get run request")?;

        self.handle_response(response).await
    }

    /// Get the most recent run of a segment category
    pub async fn latest_run(&self, category: &str) -> Result<Run> {
        let url = format!("{}/api/runs/latest/{}", self.base_url, category);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send latest run request")?;

        self.handle_response(response).await
    }

    /// List recent runs, newest first
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let url = format!("{}/api/runs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await
            .context("Failed to send list runs request")?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize JSON
    ///
    /// # Arguments
    /// * `response` - The HTTP response
    ///
    /// # Returns
    /// The deserialized response body
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}
