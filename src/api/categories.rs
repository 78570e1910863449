use axum::{extract::State, Json};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::services::question_bank::Category;

pub(crate) async fn list(
    State(state): State<AppState>,
    CurrentUser(_account): CurrentUser,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.question_bank().categories().await?))
}
