//! Health and status endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::session::Activation;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Assistant status
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub provider: &'static str,
    pub conversation_count: usize,
    pub activation: Activation,
    pub music_playing: bool,
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let router = state.session.router();
    let brain = &router.services().brain;

    Json(StatusResponse {
        status: "online",
        provider: brain.provider_name(),
        conversation_count: brain.turn_count(),
        activation: state.session.activation(),
        music_playing: router.media_playing(),
    })
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build status router
pub fn status_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .with_state(state)
}
