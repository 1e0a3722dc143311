// Refresh trigger for deployments where panels are rendered elsewhere
use crate::application::snapshot_api::DashboardRefresher;
use crate::domain::dashboard::DashboardDefinition;
use async_trait::async_trait;

/// Records the refresh request in the log. The renderer answers by pushing
/// fresh `snapshotData` to `PUT /share/sessions/:id/dashboard` during the
/// fixed wait.
#[derive(Debug, Clone, Default)]
pub struct LoggingRefresher;

#[async_trait]
impl DashboardRefresher for LoggingRefresher {
    async fn start_refresh(&self, dashboard: &DashboardDefinition) {
        tracing::info!(
            dashboard = %dashboard.title,
            uid = dashboard.uid.as_deref().unwrap_or("-"),
            panels = dashboard.panels.len(),
            "Dashboard refresh requested"
        );
    }
}
