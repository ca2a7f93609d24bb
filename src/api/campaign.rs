use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::mpsc::error::TrySendError;

use crate::api::AppState;
use crate::domain::{Address, LeaderboardEntry, PointHistory, TaskName, TaskStatusView};
use crate::error::AppError;
use crate::ingest::SwapEvent;

/// Success body shared by the campaign read endpoints: `{"status":"ok","result":...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub result: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Json<Self> {
        Json(Self { status: "ok", result })
    }
}

fn parse_address(raw: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub async fn start_campaign(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.service.start_campaign().await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

pub async fn get_point_histories(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PointHistory>>>, AppError> {
    let address = parse_address(&address)?;
    Ok(ApiResponse::ok(state.service.get_point_histories(&address).await?))
}

pub async fn get_task_status(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TaskStatusView>>>, AppError> {
    let address = parse_address(&address)?;
    Ok(ApiResponse::ok(state.service.get_task_status(&address).await?))
}

pub async fn get_leaderboard(
    Path((task_name, period)): Path<(String, i32)>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>, AppError> {
    let name = TaskName::from_str(&task_name).map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(ApiResponse::ok(state.service.get_leaderboard(name, period).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub sender: String,
    pub amount_in: f64,
    pub amount_out: f64,
}

/// Enqueue an already-decoded swap for the ingestor.
pub async fn post_swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> Result<StatusCode, AppError> {
    let sender = parse_address(&req.sender)?;
    for (field, amount) in [("amountIn", req.amount_in), ("amountOut", req.amount_out)] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::BadRequest(format!(
                "{} must be a non-negative number",
                field
            )));
        }
    }

    let event = SwapEvent {
        sender,
        amount_in: req.amount_in,
        amount_out: req.amount_out,
    };

    state.swaps.try_send(event).map_err(|e| match e {
        TrySendError::Full(_) => AppError::Unavailable("swap queue is full".to_string()),
        TrySendError::Closed(_) => AppError::Internal("swap ingestor stopped".to_string()),
    })?;

    Ok(StatusCode::ACCEPTED)
}
