//! Query run endpoints

use async_trait::async_trait;
use quarry_core::domain::run::Row;
use serde_json::json;

use crate::ExplorerClient;
use crate::error::Result;
use crate::payload::{self, RemoteStatus};
use crate::remote::RemoteQuery;

#[async_trait]
impl RemoteQuery for ExplorerClient {
    fn check_credentials(&self) -> Result<()> {
        self.api_key()?;
        self.query_id()?;
        Ok(())
    }

    /// POST /explorer/queries/{query_id}/run-async
    async fn submit(&self, sql_query: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/explorer/queries/{}/run-async",
            self.base_url,
            self.query_id()?
        );

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&json!({ "parameters": { "sql_query": sql_query } }))
            .send()
            .await?;

        let body = self.handle_response(response).await?;
        let run_id = payload::parse_run_id(&body)?;

        tracing::debug!("Explorer accepted query as run {}", run_id);
        Ok(run_id)
    }

    /// GET /explorer/query-runs/{id}/status
    async fn status(&self, remote_run_id: &str) -> Result<RemoteStatus> {
        let url = format!(
            "{}/explorer/query-runs/{}/status",
            self.base_url, remote_run_id
        );

        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", self.api_key()?)
            .send()
            .await?;

        let body = self.handle_response(response).await?;
        Ok(payload::parse_status(&body))
    }

    /// GET /explorer/query-runs/{id}/results?f=json
    async fn fetch_results(&self, remote_run_id: &str) -> Result<Vec<Row>> {
        let url = format!(
            "{}/explorer/query-runs/{}/results",
            self.base_url, remote_run_id
        );

        let response = self
            .client
            .get(&url)
            .query(&[("f", "json")])
            .header("X-API-KEY", self.api_key()?)
            .send()
            .await?;

        let body = self.handle_response(response).await?;
        payload::parse_rows(body)
    }
}
