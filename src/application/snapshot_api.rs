// Ports for the snapshot workflow: the remote snapshot API and the panel refresh trigger
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::snapshot::{SharedOptions, SnapshotRequest, SnapshotResult};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotApiError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} responded with status {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// `GET /api/snapshot/shared-options`
    async fn shared_options(&self) -> Result<SharedOptions, SnapshotApiError>;

    /// `POST /api/snapshots`
    async fn create_snapshot(&self, request: &SnapshotRequest) -> Result<SnapshotResult, SnapshotApiError>;

    /// `GET <deleteUrl>`
    async fn delete_snapshot(&self, delete_url: &str) -> Result<(), SnapshotApiError>;
}

/// Asks whatever renders the dashboard to re-run its panel queries so fresh
/// data is captured before the snapshot is taken. Completion is not reported.
#[async_trait]
pub trait DashboardRefresher: Send + Sync {
    async fn start_refresh(&self, dashboard: &DashboardDefinition);
}
