// Presentation layer - HTTP routes
pub mod app_state;
pub mod error;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    close_session, delete_snapshot, get_session, health_check, list_expire_options, open_session,
    push_rendered_data, share_links, submit_snapshot,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/share/expire-options", get(list_expire_options))
        .route("/share/sessions", post(open_session))
        .route("/share/sessions/:id", get(get_session).delete(close_session))
        .route("/share/sessions/:id/dashboard", put(push_rendered_data))
        .route(
            "/share/sessions/:id/snapshot",
            post(submit_snapshot).delete(delete_snapshot),
        )
        .route("/share/sessions/:id/links", post(share_links))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
