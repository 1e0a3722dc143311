// Share workflow - drives a share session through Compose -> Result -> Deleted
use crate::application::error::ShareError;
use crate::application::scrub::scrub;
use crate::application::session_store::{LoadingGuard, SessionStore};
use crate::application::share_links::{LinkOptions, ShareLinkBuilder, ShareLinks};
use crate::application::snapshot_service::SnapshotService;
use crate::domain::context::ShareContext;
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::share::{DeleteAction, RenderedData, ShareSession};
use crate::domain::snapshot::{Expiry, SharedOptions, SnapshotResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Values used when a submission does not override them.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotDefaults {
    pub timeout: Duration,
    pub expires: Expiry,
}

impl Default for SnapshotDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            expires: Expiry::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenShare {
    pub dashboard: DashboardDefinition,
    pub panel_id: Option<i64>,
    pub embedded: bool,
    pub is_snapshot: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSubmission {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expires: Option<Expiry>,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// An accepted submit. The capture keeps running in its own task whether or
/// not anyone awaits `task`.
pub struct Submitted {
    pub session: ShareSession,
    pub task: JoinHandle<Result<SnapshotResult, ShareError>>,
}

/// Everything the background capture needs, fixed when the submit is accepted.
struct Capture {
    id: Uuid,
    dashboard: DashboardDefinition,
    name: Option<String>,
    expires: Expiry,
    external: bool,
    delay: Duration,
    context: ShareContext,
}

#[derive(Clone)]
pub struct ShareWorkflow {
    service: SnapshotService,
    sessions: Arc<SessionStore>,
    links: ShareLinkBuilder,
    defaults: SnapshotDefaults,
    idle_ttl: Duration,
}

impl ShareWorkflow {
    pub fn new(service: SnapshotService, links: ShareLinkBuilder, defaults: SnapshotDefaults) -> Self {
        Self {
            service,
            sessions: Arc::new(SessionStore::new()),
            links,
            defaults,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn defaults(&self) -> SnapshotDefaults {
        self.defaults
    }

    /// Start a session. Shared options are fetched once here; if the server
    /// cannot be asked, external sharing is simply not offered.
    pub async fn open(&self, request: OpenShare) -> Result<ShareSession, ShareError> {
        if let Some(id) = request.panel_id {
            request.dashboard.panel(id).ok_or(ShareError::PanelNotFound(id))?;
        }

        let shared_options = match self.service.shared_options().await {
            Ok(options) => options,
            Err(e) => {
                tracing::warn!("Could not fetch snapshot shared options: {}", e);
                SharedOptions::default()
            }
        };

        let session = ShareSession::new(
            request.dashboard,
            request.panel_id,
            request.embedded,
            request.is_snapshot,
            shared_options,
        );
        let id = self.sessions.insert(session.clone());
        tracing::info!(session = %id, open_sessions = self.sessions.len(), "Share session opened");
        Ok(session)
    }

    pub fn session(&self, id: Uuid) -> Result<ShareSession, ShareError> {
        self.sessions.get(id)
    }

    /// Accept a submit and hand the refresh, wait, scrub and upload to a
    /// spawned task. The returned session is already loading. Once accepted
    /// the capture cannot be aborted by the caller going away.
    pub fn submit(
        &self,
        id: Uuid,
        submission: SnapshotSubmission,
        context: &ShareContext,
    ) -> Result<Submitted, ShareError> {
        let external = submission.external;

        let (session, embedded) = self.sessions.update(id, |s| {
            if external && !s.external_offered() {
                return Err(ShareError::ExternalDisabled);
            }
            s.begin_submit(external, &context.location, context.now)?;
            Ok((s.clone(), s.embedded))
        })??;
        let guard = LoadingGuard::new(self.sessions.clone(), id);

        // Embedded dialogs hide the name, expiry and timeout fields
        let submission = if embedded {
            SnapshotSubmission {
                external,
                ..Default::default()
            }
        } else {
            submission
        };

        let capture = Capture {
            id,
            dashboard: session.dashboard.clone(),
            name: submission.name,
            expires: submission.expires.unwrap_or(self.defaults.expires),
            external,
            delay: submission
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(self.defaults.timeout),
            context: context.clone(),
        };
        tracing::info!(session = %id, external, delay = ?capture.delay, "Snapshot submitted, refreshing panels");

        let workflow = self.clone();
        let task = tokio::spawn(async move {
            let outcome = workflow.capture(&capture).await;
            if let Err(e) = &outcome {
                tracing::error!(session = %id, error = %e, "Snapshot creation failed");
                let _ = workflow.sessions.update(id, |s| s.fail(e.to_string()));
            }
            drop(guard);
            outcome
        });

        Ok(Submitted { session, task })
    }

    async fn capture(&self, capture: &Capture) -> Result<SnapshotResult, ShareError> {
        let id = capture.id;
        self.service.refresh_and_wait(&capture.dashboard, capture.delay).await;

        let saved_at = capture.context.advanced_by(capture.delay);
        let scrubbed = self.sessions.update(id, |s| {
            let name = capture.name.clone().unwrap_or_else(|| s.dashboard.title.clone());
            let panel = s.panel().cloned();
            scrub(&mut s.dashboard, &name, panel.as_ref(), &saved_at)
        })?;

        let result = self
            .service
            .create_snapshot(scrubbed, capture.expires, capture.external)
            .await?;
        self.sessions.update(id, |s| s.complete(result.clone()))?;
        Ok(result)
    }

    /// Accept panel data rendered during the refresh wait.
    pub fn push_rendered(&self, id: Uuid, data: RenderedData) -> Result<ShareSession, ShareError> {
        let panels = data.panels.len();
        self.sessions.update(id, |s| s.apply_rendered_data(data))??;
        tracing::debug!(session = %id, panels, "Rendered panel data received");
        self.session(id)
    }

    /// Delete the session's snapshot. Repeating it once deleted does nothing.
    pub async fn delete(&self, id: Uuid) -> Result<ShareSession, ShareError> {
        match self.sessions.update(id, |s| s.delete_action())?? {
            DeleteAction::Send(delete_url) => {
                self.service.delete_snapshot(&delete_url).await?;
                self.sessions.update(id, |s| s.mark_deleted())?;
                tracing::info!(session = %id, "Share session snapshot deleted");
            }
            DeleteAction::AlreadyDeleted => {
                tracing::debug!(session = %id, "Snapshot already deleted");
            }
        }

        self.session(id)
    }

    pub fn links(&self, id: Uuid, options: &LinkOptions, context: &ShareContext) -> Result<ShareLinks, ShareError> {
        let session = self.sessions.get(id)?;
        Ok(self.links.build(&session.dashboard, session.panel(), options, context))
    }

    /// Close the dialog. A published snapshot is left on the server.
    pub fn close(&self, id: Uuid) -> Result<(), ShareError> {
        self.sessions.remove(id)?;
        tracing::info!(session = %id, open_sessions = self.sessions.len(), "Share session closed");
        Ok(())
    }

    /// Periodically drop sessions idle for longer than the configured TTL.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        let idle_ttl = self.idle_ttl;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = sessions.purge_idle(idle_ttl);
                if removed > 0 {
                    tracing::info!(removed, open_sessions = sessions.len(), "Expired idle share sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::snapshot_api::SnapshotApiError;
    use crate::application::test_utils::{sample_result, RecordingApi, RecordingRefresher};
    use crate::domain::share::{RenderedPanel, ShareStep, TransitionError};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn workflow(api: Arc<RecordingApi>, refresher: Arc<RecordingRefresher>) -> ShareWorkflow {
        ShareWorkflow::new(
            SnapshotService::new(api, refresher),
            ShareLinkBuilder::new(""),
            SnapshotDefaults::default(),
        )
    }

    fn dashboard() -> DashboardDefinition {
        serde_json::from_value(json!({
            "title": "Launch KPIs",
            "time": {"from": "now-1h", "to": "now"},
            "panels": [
                {"id": 1, "datasource": "prometheus", "targets": [{"expr": "up"}],
                 "snapshotData": [{"target": "up"}]},
                {"id": 2, "targets": [{"expr": "rate(errors[5m])"}], "links": [{"url": "x"}]}
            ],
            "annotations": {"list": [{"name": "Deploys", "enable": true, "expr": "deploys"}]}
        }))
        .unwrap()
    }

    fn open_request(panel_id: Option<i64>) -> OpenShare {
        OpenShare {
            dashboard: dashboard(),
            panel_id,
            embedded: false,
            is_snapshot: false,
        }
    }

    fn context() -> ShareContext {
        ShareContext::new(
            "https://host/d/abc/launch-kpis?orgId=1",
            1,
            Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        )
    }

    async fn submit_and_wait(
        wf: &ShareWorkflow,
        id: Uuid,
        submission: SnapshotSubmission,
    ) -> Result<SnapshotResult, ShareError> {
        wf.submit(id, submission, &context())?.task.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_then_delete() {
        let api = Arc::new(RecordingApi::succeeding());
        let refresher = Arc::new(RecordingRefresher::default());
        let wf = workflow(api.clone(), refresher.clone());

        let session = wf.open(open_request(None)).await.unwrap();
        assert_eq!(session.step(), ShareStep::Compose);
        assert!(session.shared_options.external_enabled);

        let started = tokio::time::Instant::now();
        let submission = SnapshotSubmission {
            name: Some("Launch KPIs".to_string()),
            expires: Some(Expiry::ONE_HOUR),
            ..Default::default()
        };
        let submitted = wf.submit(session.id, submission, &context()).unwrap();
        assert!(submitted.session.is_loading());
        assert_eq!(submitted.session.step(), ShareStep::Compose);

        assert_eq!(submitted.task.await.unwrap().unwrap(), sample_result());

        let done = wf.session(session.id).unwrap();
        assert_eq!(done.step(), ShareStep::Result);
        assert!(!done.is_loading());
        assert_eq!(done.result(), Some(&sample_result()));
        assert_eq!(refresher.count(), 1);
        assert!(api.created_at()[0] - started >= Duration::from_secs(20));

        let sent = &api.created()[0];
        assert_eq!(sent["name"], json!("Launch KPIs"));
        assert_eq!(sent["expires"], json!(3600));
        assert_eq!(sent["external"], json!(false));
        assert_eq!(sent["dashboard"]["panels"][0]["targets"], json!([]));
        assert_eq!(sent["dashboard"]["panels"][0]["snapshotData"], json!([{"target": "up"}]));
        assert_eq!(sent["dashboard"]["snapshot"]["originalUrl"], json!("https://host/d/abc/launch-kpis?orgId=1"));
        // Time range is resolved at save time, after the wait
        assert_eq!(sent["dashboard"]["time"]["to"], json!("2026-10-16T12:00:20.000Z"));

        // Live dashboard keeps its queries but loses the cached data
        assert_eq!(done.dashboard.panels[0].targets.len(), 1);
        assert!(done.dashboard.panels[0].snapshot_data.is_none());
        assert!(done.dashboard.snapshot.is_none());

        let deleted = wf.delete(session.id).await.unwrap();
        assert_eq!(deleted.step(), ShareStep::Deleted);
        assert_eq!(api.deleted(), vec![sample_result().delete_url]);

        let again = wf.delete(session.id).await.unwrap();
        assert_eq!(again.step(), ShareStep::Deleted);
        assert_eq!(api.deleted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_create_stays_in_compose() {
        let api = Arc::new(RecordingApi::failing());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let err = submit_and_wait(&wf, session.id, SnapshotSubmission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::Upstream(SnapshotApiError::Status { .. })));

        let after = wf.session(session.id).unwrap();
        assert_eq!(after.step(), ShareStep::Compose);
        assert!(!after.is_loading());
        assert!(after.last_error().unwrap().contains("500"));
        assert_eq!(api.created()[0]["expires"], json!(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_rejected_while_loading() {
        let api = Arc::new(RecordingApi::succeeding());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let first = wf
            .submit(session.id, SnapshotSubmission::default(), &context())
            .unwrap();
        assert!(wf.session(session.id).unwrap().is_loading());

        let err = wf
            .submit(session.id, SnapshotSubmission::default(), &context())
            .err()
            .unwrap();
        assert!(matches!(err, ShareError::Transition(TransitionError::SnapshotInProgress)));

        first.task.await.unwrap().unwrap();
        assert_eq!(api.created().len(), 1);

        let err = wf
            .submit(session.id, SnapshotSubmission::default(), &context())
            .err()
            .unwrap();
        assert!(matches!(err, ShareError::Transition(TransitionError::AlreadySubmitted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_going_away_does_not_abort_capture() {
        let api = Arc::new(RecordingApi::succeeding().with_create_delay(Duration::from_secs(2)));
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        // The caller gives up after 21s, while the upload is still in flight
        let caller = tokio::time::timeout(Duration::from_secs(21), async {
            let submitted = wf
                .submit(session.id, SnapshotSubmission::default(), &context())
                .unwrap();
            submitted.task.await
        })
        .await;
        assert!(caller.is_err());
        assert_eq!(api.created().len(), 1);
        assert!(wf.session(session.id).unwrap().is_loading());

        tokio::time::sleep(Duration::from_secs(5)).await;

        let after = wf.session(session.id).unwrap();
        assert_eq!(after.step(), ShareStep::Result);
        assert!(!after.is_loading());
        assert_eq!(after.result(), Some(&sample_result()));
        assert_eq!(api.created().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_panel_snapshot() {
        let api = Arc::new(RecordingApi::succeeding());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(Some(2))).await.unwrap();

        submit_and_wait(&wf, session.id, SnapshotSubmission::default())
            .await
            .unwrap();

        let panels = api.created()[0]["dashboard"]["panels"].clone();
        assert_eq!(panels.as_array().unwrap().len(), 1);
        assert_eq!(panels[0]["id"], json!(2));
        assert_eq!(panels[0]["gridPos"], json!({"x": 0, "y": 0, "w": 24, "h": 20}));
        assert_eq!(panels[0]["links"], json!([]));
        assert_eq!(panels[0]["targets"], json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rendered_data_reaches_single_panel_snapshot() {
        let api = Arc::new(RecordingApi::succeeding());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(Some(1))).await.unwrap();

        let submitted = wf
            .submit(session.id, SnapshotSubmission::default(), &context())
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let rendered = RenderedData {
            panels: vec![RenderedPanel {
                id: 1,
                snapshot_data: json!([{"target": "up", "datapoints": [[1, 1792152000000i64]]}]),
            }],
            annotations: vec![],
        };
        let loading = wf.push_rendered(session.id, rendered).unwrap();
        assert!(loading.is_loading());

        submitted.task.await.unwrap().unwrap();

        let panels = api.created()[0]["dashboard"]["panels"].clone();
        assert_eq!(panels.as_array().unwrap().len(), 1);
        assert_eq!(panels[0]["snapshotData"][0]["datapoints"], json!([[1, 1792152000000i64]]));

        // The live panel's cache is cleared once the copy is taken
        let after = wf.session(session.id).unwrap();
        assert!(after.panel().unwrap().snapshot_data.is_none());
    }

    #[tokio::test]
    async fn test_rendered_data_needs_a_running_submit() {
        let wf = workflow(Arc::new(RecordingApi::succeeding()), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let err = wf.push_rendered(session.id, RenderedData::default()).unwrap_err();
        assert!(matches!(err, ShareError::Transition(TransitionError::NotRefreshing)));
    }

    #[tokio::test]
    async fn test_unknown_panel_is_rejected() {
        let wf = workflow(Arc::new(RecordingApi::succeeding()), Arc::new(RecordingRefresher::default()));
        let err = wf.open(open_request(Some(99))).await.unwrap_err();
        assert!(matches!(err, ShareError::PanelNotFound(99)));
    }

    #[tokio::test]
    async fn test_external_requires_server_support() {
        let api = Arc::new(RecordingApi::succeeding().with_external_disabled());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let submission = SnapshotSubmission {
            external: true,
            ..Default::default()
        };
        let err = wf.submit(session.id, submission, &context()).err().unwrap();
        assert!(matches!(err, ShareError::ExternalDisabled));
        assert!(!wf.session(session.id).unwrap().is_loading());
        assert!(api.created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_snapshot_has_no_original_url() {
        let api = Arc::new(RecordingApi::succeeding());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let submission = SnapshotSubmission {
            external: true,
            timeout_seconds: Some(1),
            ..Default::default()
        };
        let started = tokio::time::Instant::now();
        submit_and_wait(&wf, session.id, submission).await.unwrap();

        let sent = &api.created()[0];
        assert_eq!(sent["external"], json!(true));
        assert!(sent["dashboard"]["snapshot"].get("originalUrl").is_none());
        let waited = api.created_at()[0] - started;
        assert!(waited >= Duration::from_secs(1) && waited < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedded_dialog_uses_defaults() {
        let api = Arc::new(RecordingApi::succeeding());
        let wf = workflow(api.clone(), Arc::new(RecordingRefresher::default()));
        let session = wf
            .open(OpenShare {
                embedded: true,
                ..open_request(None)
            })
            .await
            .unwrap();

        let submission = SnapshotSubmission {
            name: Some("Ignored".to_string()),
            expires: Some(Expiry::SEVEN_DAYS),
            ..Default::default()
        };
        submit_and_wait(&wf, session.id, submission).await.unwrap();

        let sent = &api.created()[0];
        assert_eq!(sent["name"], json!("Launch KPIs"));
        assert_eq!(sent["expires"], json!(0));
    }

    #[tokio::test]
    async fn test_delete_before_submit_fails() {
        let wf = workflow(Arc::new(RecordingApi::succeeding()), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let err = wf.delete(session.id).await.unwrap_err();
        assert!(matches!(err, ShareError::Transition(TransitionError::NothingToDelete)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_keeps_result() {
        let api = Arc::new(RecordingApi::succeeding());
        let wf = workflow(api, Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();
        submit_and_wait(&wf, session.id, SnapshotSubmission::default())
            .await
            .unwrap();

        // Swap in a failing API behind the same session store
        let failing = ShareWorkflow {
            service: SnapshotService::new(
                Arc::new(RecordingApi::failing()),
                Arc::new(RecordingRefresher::default()),
            ),
            ..wf.clone()
        };
        assert!(failing.delete(session.id).await.is_err());
        assert_eq!(wf.session(session.id).unwrap().step(), ShareStep::Result);
    }

    #[tokio::test]
    async fn test_links_for_session() {
        let wf = workflow(Arc::new(RecordingApi::succeeding()), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(Some(1))).await.unwrap();

        let links = wf.links(session.id, &LinkOptions::default(), &context()).unwrap();
        assert!(links.share_url.ends_with("panelId=1&fullscreen=true"));
        assert!(links.solo_url.starts_with("https://host/d-solo/abc/launch-kpis?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_refused_while_loading() {
        let wf = workflow(Arc::new(RecordingApi::succeeding()), Arc::new(RecordingRefresher::default()));
        let session = wf.open(open_request(None)).await.unwrap();

        let submitted = wf
            .submit(session.id, SnapshotSubmission::default(), &context())
            .unwrap();
        let err = wf.close(session.id).unwrap_err();
        assert!(matches!(err, ShareError::Transition(TransitionError::Busy)));

        submitted.task.await.unwrap().unwrap();
        wf.close(session.id).unwrap();
        assert!(matches!(wf.session(session.id), Err(ShareError::SessionNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_idle_sessions() {
        let wf = workflow(Arc::new(RecordingApi::succeeding()), Arc::new(RecordingRefresher::default()))
            .with_idle_ttl(Duration::from_secs(60));
        let stale = wf.open(open_request(None)).await.unwrap();
        let sweeper = wf.spawn_sweeper(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(45)).await;
        let fresh = wf.open(open_request(None)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(45)).await;

        assert!(wf.session(stale.id).is_err());
        assert!(wf.session(fresh.id).is_ok());
        sweeper.abort();
    }
}
