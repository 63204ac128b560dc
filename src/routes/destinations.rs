//! Destinations, gated on the premium tier.
//!
//! GET /destinations, POST /destinations/meta/validate, POST /destinations/meta

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::Form;
use std::sync::Arc;

use crate::AppState;
use crate::audit;
use crate::destinations::{MetaDestinationForm, StoredDestination};
use crate::error::AppError;
use crate::types::ValidationResponse;
use crate::users::AuthenticatedUser;

pub async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Json<Vec<StoredDestination>> {
    Json(state.destinations.list(user.owner_prefix()))
}

/// Live validation; never stores anything.
pub async fn validate_meta(Form(form): Form<MetaDestinationForm>) -> Json<ValidationResponse> {
    let errors = match form.to_config().validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.messages().to_vec(),
    };
    Json(ValidationResponse {
        valid: errors.is_empty(),
        errors,
    })
}

pub async fn create_meta(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Form(form): Form<MetaDestinationForm>,
) -> Result<(StatusCode, Json<StoredDestination>), AppError> {
    let stored = state
        .destinations
        .create(user.owner_prefix(), &user.id, form.to_config())?;

    audit::record(&state.metrics, "destination_created", &user.id, &stored.id.to_string());
    tracing::info!(
        user_id = %user.id,
        destination_id = %stored.id,
        kind = stored.config.type_name(),
        "Destination created"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}
