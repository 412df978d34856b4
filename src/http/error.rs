//! json error responses for http handlers
use crate::error::{StoreError, WorkflowError};
use crate::reference::AchievementStatus;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    /// 401, the gateway did not forward a usable principal
    Unauthorized(String),
    /// 400
    BadRequest(String),
    /// 400 with the status that blocked the transition
    Conflict {
        message: String,
        current: AchievementStatus,
    },
    /// 403
    Forbidden(String),
    /// 404
    NotFound(String),
    /// 500, carrying the raw underlying error
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_status: Option<AchievementStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(err) => ApiError::BadRequest(err.to_string()),
            WorkflowError::Forbidden(msg) => ApiError::Forbidden(msg),
            WorkflowError::NotFound(msg) => ApiError::NotFound(msg),
            WorkflowError::InvalidTransition { message, current } => ApiError::Conflict { message, current },
            WorkflowError::Storage(err) => ApiError::internal(err),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::Conflict { message, current } => ErrorBody {
                error: message,
                current_status: Some(current),
                details: None,
            },
            ApiError::Internal(details) => {
                tracing::error!(error = %details, "request failed with a storage error");
                ErrorBody {
                    error: "internal server error".to_string(),
                    current_status: None,
                    details: Some(details),
                }
            }
            ApiError::Unauthorized(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => ErrorBody {
                error: msg,
                current_status: None,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
