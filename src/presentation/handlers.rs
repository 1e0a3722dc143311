// HTTP request handlers
use crate::application::share_links::{LinkOptions, ShareLinks};
use crate::application::share_workflow::{OpenShare, SnapshotSubmission};
use crate::domain::context::ShareContext;
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::share::{RenderedData, ShareSession, ShareStep, ShareTab};
use crate::domain::snapshot::{expire_options, ExpireOption, Expiry, SnapshotResult};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionBody {
    pub dashboard: DashboardDefinition,
    #[serde(default)]
    pub panel_id: Option<i64>,
    #[serde(default)]
    pub embedded: bool,
    #[serde(default)]
    pub is_snapshot: bool,
}

#[derive(Deserialize)]
pub struct SubmitBody {
    #[serde(flatten)]
    pub submission: SnapshotSubmission,
    pub context: ShareContext,
}

#[derive(Deserialize)]
pub struct LinksBody {
    #[serde(flatten)]
    pub options: LinkOptions,
    pub context: ShareContext,
}

#[derive(Serialize)]
pub struct TabView {
    pub id: ShareTab,
    pub title: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub step: ShareStep,
    pub loading: bool,
    pub tabs: Vec<TabView>,
    pub snapshot_name: String,
    pub expires: Expiry,
    pub timeout_seconds: u64,
    pub external_offered: bool,
    pub external_snapshot_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SnapshotResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionView {
    fn from_session(session: &ShareSession, state: &AppState) -> Self {
        let defaults = state.workflow.defaults();
        Self {
            id: session.id,
            step: session.step(),
            loading: session.is_loading(),
            tabs: session
                .tabs()
                .into_iter()
                .map(|tab| TabView {
                    id: tab,
                    title: tab.title(session.embedded),
                })
                .collect(),
            snapshot_name: session.dashboard.title.clone(),
            expires: defaults.expires,
            timeout_seconds: defaults.timeout.as_secs(),
            external_offered: session.external_offered(),
            external_snapshot_name: session.shared_options.external_snapshot_name.clone(),
            result: session.result().cloned(),
            error: session.last_error().map(str::to_string),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_expire_options() -> Json<Vec<ExpireOption>> {
    Json(expire_options())
}

pub async fn open_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OpenSessionBody>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let session = state
        .workflow
        .open(OpenShare {
            dashboard: body.dashboard,
            panel_id: body.panel_id,
            embedded: body.embedded,
            is_snapshot: body.is_snapshot,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SessionView::from_session(&session, &state))))
}

pub async fn get_session(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SessionView>> {
    let session = state.workflow.session(id)?;
    Ok(Json(SessionView::from_session(&session, &state)))
}

/// Starts the capture and answers right away with the loading session.
/// Clients poll `GET /share/sessions/:id` for the result.
pub async fn submit_snapshot(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let submitted = state.workflow.submit(id, body.submission, &body.context)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SessionView::from_session(&submitted.session, &state)),
    ))
}

pub async fn push_rendered_data(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<RenderedData>,
) -> ApiResult<Json<SessionView>> {
    let session = state.workflow.push_rendered(id, body)?;
    Ok(Json(SessionView::from_session(&session, &state)))
}

pub async fn close_session(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.workflow.close(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_snapshot(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SessionView>> {
    let session = state.workflow.delete(id).await?;
    Ok(Json(SessionView::from_session(&session, &state)))
}

pub async fn share_links(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<LinksBody>,
) -> ApiResult<Json<ShareLinks>> {
    let links = state.workflow.links(id, &body.options, &body.context)?;
    Ok(Json(links))
}
