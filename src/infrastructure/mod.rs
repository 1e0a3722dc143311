// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod grafana_snapshot_api;
pub mod panel_refresher;
