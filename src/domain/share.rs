// Share session - state of one share dialog
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use serde_json::Value;

use super::dashboard::{DashboardDefinition, Panel, SnapshotMeta};
use super::snapshot::{SharedOptions, SnapshotResult};

/// Compose -> Result -> Deleted. Nothing leads back to Compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStep {
    Compose,
    Result,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a snapshot is already being created")]
    SnapshotInProgress,
    #[error("snapshot already created for this session")]
    AlreadySubmitted,
    #[error("no snapshot to delete")]
    NothingToDelete,
    #[error("panel data is only accepted while a snapshot is being created")]
    NotRefreshing,
    #[error("a snapshot is being created for this session")]
    Busy,
}

/// Panel data rendered during the refresh wait, pushed by whatever renders
/// the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedData {
    #[serde(default)]
    pub panels: Vec<RenderedPanel>,
    #[serde(default)]
    pub annotations: Vec<RenderedAnnotation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPanel {
    pub id: i64,
    pub snapshot_data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedAnnotation {
    pub name: String,
    pub snapshot_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderedDataError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("panel {0} not found in dashboard")]
    UnknownPanel(i64),
}

/// What a delete request should do given the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteAction {
    Send(String),
    AlreadyDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareTab {
    Link,
    Embed,
    Snapshot,
    Export,
}

impl ShareTab {
    pub fn title(&self, embedded: bool) -> &'static str {
        match self {
            ShareTab::Link if embedded => "PDF",
            ShareTab::Link => "Link / PDF",
            ShareTab::Embed => "Embed",
            ShareTab::Snapshot => "Snapshot",
            ShareTab::Export => "Export",
        }
    }
}

/// Tabs the dialog offers for a dashboard or a single panel.
pub fn available_tabs(panel_mode: bool, is_snapshot: bool, embedded: bool) -> Vec<ShareTab> {
    let mut tabs = vec![ShareTab::Link];

    if panel_mode {
        tabs.push(ShareTab::Embed);
    }
    if !is_snapshot {
        tabs.push(ShareTab::Snapshot);
    }
    if !is_snapshot && !panel_mode && !embedded {
        tabs.push(ShareTab::Export);
    }

    tabs
}

#[derive(Debug, Clone)]
pub struct ShareSession {
    pub id: Uuid,
    pub dashboard: DashboardDefinition,
    pub panel_id: Option<i64>,
    pub embedded: bool,
    pub is_snapshot: bool,
    pub shared_options: SharedOptions,
    step: ShareStep,
    loading: bool,
    result: Option<SnapshotResult>,
    last_error: Option<String>,
}

impl ShareSession {
    pub fn new(
        dashboard: DashboardDefinition,
        panel_id: Option<i64>,
        embedded: bool,
        is_snapshot: bool,
        shared_options: SharedOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            dashboard,
            panel_id,
            embedded,
            is_snapshot,
            shared_options,
            step: ShareStep::Compose,
            loading: false,
            result: None,
            last_error: None,
        }
    }

    /// The shared panel as it currently is in the live dashboard.
    pub fn panel(&self) -> Option<&Panel> {
        self.panel_id.and_then(|id| self.dashboard.panel(id))
    }

    pub fn step(&self) -> ShareStep {
        self.step
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn result(&self) -> Option<&SnapshotResult> {
        self.result.as_ref()
    }

    /// Why the most recent submit failed, cleared by the next one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn tabs(&self) -> Vec<ShareTab> {
        available_tabs(self.panel_id.is_some(), self.is_snapshot, self.embedded)
    }

    /// External sharing is only offered when the server enables it and the
    /// dialog is not embedded.
    pub fn external_offered(&self) -> bool {
        self.shared_options.external_enabled && !self.embedded
    }

    /// Raise the loading flag and stamp the live dashboard with snapshot
    /// metadata. The original URL is only recorded for local snapshots.
    pub fn begin_submit(
        &mut self,
        external: bool,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.loading {
            return Err(TransitionError::SnapshotInProgress);
        }
        if self.step != ShareStep::Compose {
            return Err(TransitionError::AlreadySubmitted);
        }

        self.loading = true;
        self.last_error = None;
        self.dashboard.snapshot = Some(SnapshotMeta {
            timestamp: now,
            original_url: (!external).then(|| location.to_string()),
        });
        Ok(())
    }

    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    pub fn fail(&mut self, message: String) {
        self.last_error = Some(message);
    }

    /// Replace cached `snapshotData` on the live dashboard with freshly
    /// rendered data. Only valid while loading; nothing changes unless every
    /// panel id is known.
    pub fn apply_rendered_data(&mut self, data: RenderedData) -> Result<(), RenderedDataError> {
        if !self.loading {
            return Err(TransitionError::NotRefreshing.into());
        }
        if let Some(missing) = data.panels.iter().find(|p| self.dashboard.panel(p.id).is_none()) {
            return Err(RenderedDataError::UnknownPanel(missing.id));
        }

        for rendered in data.panels {
            if let Some(panel) = self.dashboard.panels.iter_mut().find(|p| p.id == rendered.id) {
                panel.snapshot_data = Some(rendered.snapshot_data);
            }
        }
        for rendered in data.annotations {
            for rule in self.dashboard.annotations.list.iter_mut().filter(|r| r.name == rendered.name) {
                rule.snapshot_data = Some(rendered.snapshot_data.clone());
            }
        }
        Ok(())
    }

    /// Whether the session may be dropped from the store.
    pub fn can_close(&self) -> Result<(), TransitionError> {
        if self.loading {
            Err(TransitionError::Busy)
        } else {
            Ok(())
        }
    }

    pub fn complete(&mut self, result: SnapshotResult) {
        self.result = Some(result);
        self.step = ShareStep::Result;
    }

    pub fn delete_action(&self) -> Result<DeleteAction, TransitionError> {
        match (self.step, &self.result) {
            (ShareStep::Deleted, _) => Ok(DeleteAction::AlreadyDeleted),
            (ShareStep::Result, Some(result)) => Ok(DeleteAction::Send(result.delete_url.clone())),
            _ => Err(TransitionError::NothingToDelete),
        }
    }

    pub fn mark_deleted(&mut self) {
        if self.step == ShareStep::Result {
            self.step = ShareStep::Deleted;
        }
    }
}
