use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::exam::RegistrationResponse;

/// Newest first.
pub(crate) async fn list(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<Vec<RegistrationResponse>>, ApiError> {
    let registrations = repositories::registrations::list_by_account(state.db(), &account.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load registrations"))?;

    Ok(Json(registrations.into_iter().map(RegistrationResponse::from_db).collect()))
}
