use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the task store answers; also reports whether the campaign exists.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let started = state.service.campaign_started().await?;
    Ok(Json(serde_json::json!({
        "status": "ready",
        "campaignStarted": started,
    })))
}
