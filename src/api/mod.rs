pub mod campaign;
pub mod health;

use crate::campaign::CampaignService;
use crate::ingest::SwapEvent;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CampaignService>,
    pub swaps: mpsc::Sender<SwapEvent>,
}

impl AppState {
    pub fn new(service: Arc<CampaignService>, swaps: mpsc::Sender<SwapEvent>) -> Self {
        Self { service, swaps }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/campaign/start", post(campaign::start_campaign))
        .route("/v1/campaign/swaps", post(campaign::post_swap))
        .route(
            "/v1/campaign/points/:address",
            get(campaign::get_point_histories),
        )
        .route(
            "/v1/campaign/task-status/:address",
            get(campaign::get_task_status),
        )
        .route(
            "/v1/campaign/leaderboard/:task_name/:period",
            get(campaign::get_leaderboard),
        )
        .layer(cors)
        .with_state(state)
}
