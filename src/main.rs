// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::share_links::ShareLinkBuilder;
use crate::application::share_workflow::{ShareWorkflow, SnapshotDefaults};
use crate::application::snapshot_service::SnapshotService;
use crate::domain::snapshot::Expiry;
use crate::infrastructure::config::load_share_config;
use crate::infrastructure::grafana_snapshot_api::GrafanaSnapshotApi;
use crate::infrastructure::panel_refresher::LoggingRefresher;
use crate::presentation::app_state::AppState;
use crate::presentation::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_share_config()?;

    // Snapshot API client (infrastructure layer)
    let api = Arc::new(GrafanaSnapshotApi::new(
        config.grafana.url.clone(),
        config.grafana.token.clone(),
        Duration::from_millis(config.grafana.request_timeout_ms),
    )?);

    // Services (application layer)
    let service = SnapshotService::new(api, Arc::new(LoggingRefresher));
    let workflow = ShareWorkflow::new(
        service,
        ShareLinkBuilder::new(config.grafana.app_sub_url.clone()),
        SnapshotDefaults {
            timeout: Duration::from_secs(config.snapshot.timeout_seconds),
            expires: Expiry::from_seconds(config.snapshot.default_expires),
        },
    )
    .with_idle_ttl(Duration::from_secs(config.sessions.idle_ttl_seconds));
    workflow.spawn_sweeper(Duration::from_secs(config.sessions.sweep_interval_seconds.max(1)));

    let state = Arc::new(AppState { workflow });
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, grafana = %config.grafana.url, "Starting dashboard-share gateway");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
