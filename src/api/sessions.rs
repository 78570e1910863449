use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::{companion, exam, mentor, progress};
use crate::core::config::Settings;
use crate::core::state::AppState;
use crate::schemas::exam::SessionResponse;

/// Multipart framing on top of the document itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(settings: &Settings) -> Router<AppState> {
    let upload_limit =
        settings.storage().max_upload_size_mb as usize * 1024 * 1024 + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", post(create_session))
        .route("/:session_id", axum::routing::delete(close_session))
        .route("/:session_id/exam", post(exam::start).get(exam::view).delete(exam::abandon))
        .route("/:session_id/exam/next", post(exam::next))
        .route("/:session_id/exam/previous", post(exam::previous))
        .route("/:session_id/exam/responses", put(exam::record_response))
        .route("/:session_id/exam/submit", post(exam::submit))
        .route("/:session_id/progress", get(progress::session_history))
        .route("/:session_id/mentor/messages", get(mentor::conversation).post(mentor::ask))
        .route(
            "/:session_id/mentor/documents",
            post(mentor::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/:session_id/companion/messages",
            get(companion::conversation).post(companion::ask),
        )
        .route("/:session_id/companion/history", get(companion::history))
        .route(
            "/:session_id/companion/speech",
            post(companion::speak).get(companion::speech_audio).delete(companion::stop_speech),
        )
}

async fn create_session(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let (session_id, _) = state.sessions().create(&account.id).await?;
    crate::core::metrics::set_active_sessions(state.sessions().len().await);
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id })))
}

async fn close_session(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.sessions().remove(session_id, &account.id).await?;
    crate::core::metrics::set_active_sessions(state.sessions().len().await);
    Ok(StatusCode::NO_CONTENT)
}
