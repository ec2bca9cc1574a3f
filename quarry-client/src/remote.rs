//! Remote query contract

use async_trait::async_trait;
use quarry_core::domain::run::Row;

use crate::error::Result;
use crate::payload::RemoteStatus;

/// Submit/status/results contract of the remote query system
#[async_trait]
pub trait RemoteQuery: Send + Sync {
    /// Fails with [`crate::ClientError::MissingCredentials`] when the client
    /// cannot authenticate. Does not touch the network.
    fn check_credentials(&self) -> Result<()>;

    /// Submits a rendered query and returns the remote run id
    async fn submit(&self, sql_query: &str) -> Result<String>;

    /// Current status of a remote run
    async fn status(&self, remote_run_id: &str) -> Result<RemoteStatus>;

    /// Result rows of a successful remote run
    async fn fetch_results(&self, remote_run_id: &str) -> Result<Vec<Row>>;
}
