//! GET /dashboard

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::AppState;
use crate::types::DashboardResponse;
use crate::users::AuthenticatedUser;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Json<DashboardResponse> {
    let destination_count = state.destinations.list(user.owner_prefix()).len();
    Json(DashboardResponse {
        destination_count,
        storage_backend: state.storage.kind().into(),
        user,
    })
}
