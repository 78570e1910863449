use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_student_access, session_context, CurrentUser};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::progress::ProgressResponse;
use crate::services::progress::ProgressSeries;

async fn load(state: &AppState, student_id: String) -> Result<Json<ProgressResponse>, ApiError> {
    let records = repositories::scores::history(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load score history"))?;

    let series = ProgressSeries::new(records);
    Ok(Json(ProgressResponse::from_series(student_id, &series)))
}

/// History of the student registered in this session.
pub(crate) async fn session_history(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ProgressResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let student_id = context
        .lock()
        .await
        .student_id
        .clone()
        .ok_or_else(|| ApiError::NotFound("No student registered in this session".to_string()))?;

    load(&state, student_id).await
}

pub(crate) async fn student_history(
    Path(student_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ProgressResponse>, ApiError> {
    require_student_access(&state, &account, &student_id).await?;
    load(&state, student_id).await
}
