// Snapshot service - the create / delete contracts on top of the snapshot API
use crate::application::snapshot_api::{DashboardRefresher, SnapshotApi, SnapshotApiError};
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::snapshot::{Expiry, ScrubbedDashboard, SharedOptions, SnapshotRequest, SnapshotResult};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct SnapshotService {
    api: Arc<dyn SnapshotApi>,
    refresher: Arc<dyn DashboardRefresher>,
}

impl SnapshotService {
    pub fn new(api: Arc<dyn SnapshotApi>, refresher: Arc<dyn DashboardRefresher>) -> Self {
        Self { api, refresher }
    }

    pub async fn shared_options(&self) -> Result<SharedOptions, SnapshotApiError> {
        self.api.shared_options().await
    }

    /// Trigger a refresh and sleep for `delay`.
    ///
    /// This is a fixed wait, not a completion signal: slow panels may still
    /// be loading when it returns.
    pub async fn refresh_and_wait(&self, dashboard: &DashboardDefinition, delay: Duration) {
        self.refresher.start_refresh(dashboard).await;
        tracing::debug!("Waiting {:?} for panels to refresh", delay);
        tokio::time::sleep(delay).await;
    }

    pub async fn create_snapshot(
        &self,
        scrubbed: ScrubbedDashboard,
        expires: Expiry,
        external: bool,
    ) -> Result<SnapshotResult, SnapshotApiError> {
        let request = SnapshotRequest::new(scrubbed, expires, external);
        tracing::info!(
            name = %request.name,
            expires = request.expires.seconds(),
            external,
            "Creating snapshot"
        );

        let result = self.api.create_snapshot(&request).await?;
        tracing::info!(url = %result.url, "Snapshot created");
        Ok(result)
    }

    pub async fn delete_snapshot(&self, delete_url: &str) -> Result<(), SnapshotApiError> {
        self.api.delete_snapshot(delete_url).await?;
        tracing::info!("Snapshot deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scrub::scrub;
    use crate::application::test_utils::{sample_result, RecordingApi, RecordingRefresher};
    use crate::domain::context::ShareContext;
    use chrono::Utc;
    use serde_json::json;

    fn service(api: Arc<RecordingApi>, refresher: Arc<RecordingRefresher>) -> SnapshotService {
        SnapshotService::new(api, refresher)
    }

    fn scrubbed(title: &str) -> ScrubbedDashboard {
        let mut live = DashboardDefinition {
            title: "Live".to_string(),
            ..Default::default()
        };
        scrub(&mut live, title, None, &ShareContext::new("https://host/d/abc", 1, Utc::now()))
    }

    #[tokio::test]
    async fn test_create_sends_name_expiry_and_flag() {
        let api = Arc::new(RecordingApi::succeeding());
        let svc = service(api.clone(), Arc::new(RecordingRefresher::default()));

        let result = svc
            .create_snapshot(scrubbed("Launch KPIs"), Expiry::ONE_HOUR, false)
            .await
            .unwrap();

        assert_eq!(result, sample_result());
        let sent = api.created();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["name"], json!("Launch KPIs"));
        assert_eq!(sent[0]["expires"], json!(3600));
        assert_eq!(sent[0]["external"], json!(false));
    }

    #[tokio::test]
    async fn test_create_with_never_expiry_sends_zero() {
        let api = Arc::new(RecordingApi::succeeding());
        let svc = service(api.clone(), Arc::new(RecordingRefresher::default()));

        svc.create_snapshot(scrubbed("Forever"), Expiry::NEVER, true).await.unwrap();

        let sent = api.created();
        assert_eq!(sent[0]["expires"], json!(0));
        assert_eq!(sent[0]["external"], json!(true));
    }

    #[tokio::test]
    async fn test_create_failure_propagates() {
        let api = Arc::new(RecordingApi::failing());
        let svc = service(api, Arc::new(RecordingRefresher::default()));

        let err = svc
            .create_snapshot(scrubbed("Broken"), Expiry::NEVER, false)
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotApiError::Status { status: 500, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_and_wait_triggers_then_sleeps() {
        let refresher = Arc::new(RecordingRefresher::default());
        let svc = service(Arc::new(RecordingApi::succeeding()), refresher.clone());
        let dashboard = DashboardDefinition::default();

        let started = tokio::time::Instant::now();
        svc.refresh_and_wait(&dashboard, Duration::from_secs(20)).await;

        assert_eq!(refresher.count(), 1);
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_delete_hits_delete_url() {
        let api = Arc::new(RecordingApi::succeeding());
        let svc = service(api.clone(), Arc::new(RecordingRefresher::default()));

        svc.delete_snapshot("https://host/api/snapshots-delete/xyz789").await.unwrap();
        assert_eq!(api.deleted(), vec!["https://host/api/snapshots-delete/xyz789".to_string()]);
    }
}
