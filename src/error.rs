use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::campaign::CampaignError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<CampaignError> for AppError {
    fn from(err: CampaignError) -> Self {
        match err {
            CampaignError::AlreadyExists(_) => AppError::Conflict(err.to_string()),
            CampaignError::NotFound(_) | CampaignError::NoActivePeriod => {
                AppError::NotFound(err.to_string())
            }
            CampaignError::InvalidAmount(_) => AppError::BadRequest(err.to_string()),
            CampaignError::WrongTaskKind { .. }
            | CampaignError::Store(_)
            | CampaignError::Accumulator(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "status": "error",
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
