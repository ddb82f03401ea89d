//! # REST API for Health Checks
use axum::{
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use shared::HealthResponse;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Public; answers without identity headers
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}
