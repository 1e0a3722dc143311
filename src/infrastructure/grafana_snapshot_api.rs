// Grafana snapshot API client
use crate::application::snapshot_api::{SnapshotApi, SnapshotApiError};
use crate::domain::snapshot::{SharedOptions, SnapshotRequest, SnapshotResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const SNAPSHOTS_PATH: &str = "/api/snapshots";
const SHARED_OPTIONS_PATH: &str = "/api/snapshot/shared-options";

#[derive(Debug, Clone)]
pub struct GrafanaSnapshotApi {
    client: Client,
    base_url: String,
    origin: Url,
    token: Option<String>,
}

impl GrafanaSnapshotApi {
    pub fn new(base_url: String, token: Option<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let origin = Url::parse(&base_url)?;
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            origin,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Delete URLs come back absolute; relative ones are resolved against the base URL.
    fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}/{}", self.base_url, path_or_url.trim_start_matches('/'))
        }
    }

    /// The token only goes to the configured server. Delete URLs of external
    /// snapshots point at another host and are called without it.
    fn authorized(&self, url: &str, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) if self.is_own_origin(url) => request.bearer_auth(token),
            Some(_) => {
                tracing::debug!(url, "Calling foreign host without the API token");
                request
            }
            None => request,
        }
    }

    fn is_own_origin(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|target| target.origin() == self.origin.origin())
            .unwrap_or(false)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, SnapshotApiError> {
        let response = self
            .authorized(url, request)
            .send()
            .await
            .map_err(|e| SnapshotApiError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SnapshotApiError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, SnapshotApiError> {
        response.json::<T>().await.map_err(|e| SnapshotApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotApi for GrafanaSnapshotApi {
    async fn shared_options(&self) -> Result<SharedOptions, SnapshotApiError> {
        let url = self.resolve(SHARED_OPTIONS_PATH);
        let response = self.send(&url, self.client.get(&url)).await?;
        Self::decode(&url, response).await
    }

    async fn create_snapshot(&self, request: &SnapshotRequest) -> Result<SnapshotResult, SnapshotApiError> {
        let url = self.resolve(SNAPSHOTS_PATH);
        tracing::debug!("POST {} (name={})", url, request.name);
        let response = self.send(&url, self.client.post(&url).json(request)).await?;
        Self::decode(&url, response).await
    }

    async fn delete_snapshot(&self, delete_url: &str) -> Result<(), SnapshotApiError> {
        let url = self.resolve(delete_url);
        tracing::debug!("GET {}", url);
        self.send(&url, self.client.get(&url)).await?;
        Ok(())
    }
}
