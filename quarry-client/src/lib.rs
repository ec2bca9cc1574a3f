//! Quarry Explorer Client
//!
//! A thin HTTP adapter for the remote query explorer that executes segment
//! queries asynchronously.
//!
//! The explorer contract is small: submit a query and get a run id back,
//! ask for the status of that run, and fetch its rows once it succeeded.
//! [`RemoteQuery`] captures that contract so the orchestrator can be driven by
//! a fake in tests; [`ExplorerClient`] is the real implementation.
//!
//! # Example
//!
//! ```no_run
//! use quarry_client::{ExplorerClient, ExplorerConfig, RemoteQuery};
//!
//! #[tokio::main]
//! async fn main() -> quarry_client::Result<()> {
//!     let client = ExplorerClient::new(ExplorerConfig {
//!         base_url: "https://api.allium.so/api/v1".to_string(),
//!         api_key: Some("key".to_string()),
//!         query_id: Some("query".to_string()),
//!     });
//!
//!     let run_id = client.submit("SELECT 1").await?;
//!     println!("status: {:?}", client.status(&run_id).await?);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod payload;
mod remote;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use payload::RemoteStatus;
pub use remote::RemoteQuery;

use reqwest::Client;

/// Default explorer API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.allium.so/api/v1";

/// Explorer connection settings
///
/// Credentials are optional so a service can start without them; every call
/// that needs them fails with [`ClientError::MissingCredentials`].
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Base URL of the explorer API
    pub base_url: String,
    /// Value sent in the `X-API-KEY` header
    pub api_key: Option<String>,
    /// Saved explorer query that runs the submitted SQL
    pub query_id: Option<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            query_id: None,
        }
    }
}

/// HTTP client for the query explorer API
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    base_url: String,
    api_key: Option<String>,
    query_id: Option<String>,
    client: Client,
}

impl ExplorerClient {
    /// Create a new explorer client
    pub fn new(config: ExplorerConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a new explorer client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(config: ExplorerConfig, client: Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.is_empty()),
            query_id: config.query_id.filter(|q| !q.is_empty()),
            client,
        }
    }

    /// Get the base URL of the explorer
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(ClientError::MissingCredentials("API key"))
    }

    fn query_id(&self) -> Result<&str> {
        self.query_id
            .as_deref()
            .ok_or(ClientError::MissingCredentials("query id"))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and decode the body
    ///
    /// Non-2xx responses become [`ClientError::ApiError`] carrying the body.
    async fn handle_response(&self, response: reqwest::Response) -> Result<serde_json::Value> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let text = response.text().await?;
        Ok(payload::decode_body(&text))
    }
}
