//! GET /health

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::AppState;
use crate::types::HealthResponse;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        environment: state.config.environment.clone(),
        version: state.config.version.clone(),
    })
}
