//! In-memory doubles for the snapshot API and the refresh trigger.

use crate::application::snapshot_api::{DashboardRefresher, SnapshotApi, SnapshotApiError};
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::snapshot::{SharedOptions, SnapshotRequest, SnapshotResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub fn sample_result() -> SnapshotResult {
    SnapshotResult {
        url: "https://host/dashboard/snapshot/abc123".to_string(),
        delete_url: "https://host/api/snapshots-delete/xyz789".to_string(),
        key: Some("abc123".to_string()),
        delete_key: Some("xyz789".to_string()),
    }
}

pub struct RecordingApi {
    fail_create: bool,
    fail_delete: bool,
    create_delay: Option<Duration>,
    options: SharedOptions,
    created: Mutex<Vec<(Instant, Value)>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingApi {
    pub fn succeeding() -> Self {
        Self {
            fail_create: false,
            fail_delete: false,
            create_delay: None,
            options: SharedOptions {
                external_enabled: true,
                external_snapshot_name: "Publish to snapshots.example.com".to_string(),
            },
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_create: true,
            fail_delete: true,
            ..Self::succeeding()
        }
    }

    pub fn with_external_disabled(mut self) -> Self {
        self.options.external_enabled = false;
        self
    }

    /// The create call is recorded on arrival and answered after `delay`.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn created(&self) -> Vec<Value> {
        self.created.lock().unwrap().iter().map(|(_, body)| body.clone()).collect()
    }

    pub fn created_at(&self) -> Vec<Instant> {
        self.created.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotApi for RecordingApi {
    async fn shared_options(&self) -> Result<SharedOptions, SnapshotApiError> {
        Ok(self.options.clone())
    }

    async fn create_snapshot(&self, request: &SnapshotRequest) -> Result<SnapshotResult, SnapshotApiError> {
        let body = serde_json::to_value(request).unwrap();
        self.created.lock().unwrap().push((Instant::now(), body));
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_create {
            return Err(SnapshotApiError::Status {
                url: "/api/snapshots".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(sample_result())
    }

    async fn delete_snapshot(&self, delete_url: &str) -> Result<(), SnapshotApiError> {
        self.deleted.lock().unwrap().push(delete_url.to_string());

        if self.fail_delete {
            return Err(SnapshotApiError::Transport {
                url: delete_url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRefresher {
    count: AtomicUsize,
}

impl RecordingRefresher {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DashboardRefresher for RecordingRefresher {
    async fn start_refresh(&self, _dashboard: &DashboardDefinition) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
