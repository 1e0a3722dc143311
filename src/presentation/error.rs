// API error responses
use crate::application::error::ShareError;
use crate::domain::share::TransitionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub struct ApiError(pub ShareError);

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            ShareError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ShareError::PanelNotFound(_) => (StatusCode::NOT_FOUND, "PANEL_NOT_FOUND"),
            ShareError::ExternalDisabled => (StatusCode::BAD_REQUEST, "EXTERNAL_DISABLED"),
            ShareError::Transition(TransitionError::SnapshotInProgress) => {
                (StatusCode::CONFLICT, "SNAPSHOT_IN_PROGRESS")
            }
            ShareError::Transition(TransitionError::AlreadySubmitted) => {
                (StatusCode::CONFLICT, "ALREADY_SUBMITTED")
            }
            ShareError::Transition(TransitionError::NothingToDelete) => {
                (StatusCode::CONFLICT, "NOTHING_TO_DELETE")
            }
            ShareError::Transition(TransitionError::NotRefreshing) => (StatusCode::CONFLICT, "NOT_REFRESHING"),
            ShareError::Transition(TransitionError::Busy) => (StatusCode::CONFLICT, "SESSION_BUSY"),
            ShareError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, error_code = code, error = %self.0, "Share request failed");
        } else {
            tracing::warn!(request_id = %request_id, error_code = code, error = %self.0, "Share request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.0.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
