// Errors surfaced by the share workflow
use crate::application::snapshot_api::SnapshotApiError;
use crate::domain::share::{RenderedDataError, TransitionError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share session {0} not found")]
    SessionNotFound(Uuid),

    #[error("panel {0} not found in dashboard")]
    PanelNotFound(i64),

    #[error("external snapshots are not enabled on this server")]
    ExternalDisabled,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("snapshot API error: {0}")]
    Upstream(#[from] SnapshotApiError),
}

impl From<RenderedDataError> for ShareError {
    fn from(err: RenderedDataError) -> Self {
        match err {
            RenderedDataError::Transition(e) => ShareError::Transition(e),
            RenderedDataError::UnknownPanel(id) => ShareError::PanelNotFound(id),
        }
    }
}
