use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{session_context, CurrentUser};
use crate::core::state::AppState;
use crate::schemas::chat::{
    ChatTurnResponse, ConversationResponse, HistoryResponse, MessageRequest, MessageResponse,
    ReportResponse, SpeakRequest, SpeechStatusResponse,
};
use crate::services::companion;
use crate::services::conversation::WindowPolicy;
use crate::services::llm::Role;
use crate::services::sessions::SessionContext;
use crate::services::speech;

pub(crate) async fn conversation(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ConversationResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let context = context.lock().await;
    Ok(Json(ConversationResponse {
        messages: context.companion.turns().to_vec(),
        document_summary: None,
    }))
}

pub(crate) async fn ask(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(payload): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let context = session_context(&state, &account, session_id).await?;
    let mut guard = context.lock().await;
    let context = &mut *guard;

    let conversation_id = context.conversation_id();
    let reply = companion::ask(
        state.companion_llm(),
        state.db(),
        WindowPolicy::from_settings(state.settings().chat()),
        &mut context.companion,
        conversation_id,
        &account.id,
        payload.text.trim(),
    )
    .await?;

    let speaking = if payload.speak && state.settings().speech().enabled {
        Some(start_speech(&state, context, &reply))
    } else {
        None
    };

    Ok(Json(MessageResponse { reply, speaking }))
}

pub(crate) async fn history(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<HistoryResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let conversation_id = context.lock().await.conversation_id();

    let turns = companion::history(state.db(), conversation_id, &account.id).await?;
    Ok(Json(HistoryResponse {
        conversation_id,
        turns: turns.into_iter().map(ChatTurnResponse::from_db).collect(),
    }))
}

/// Works for closed sessions too, since turns are durable.
pub(crate) async fn report(
    Path(conversation_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ReportResponse>, ApiError> {
    let report =
        companion::report(state.companion_llm(), state.db(), conversation_id, &account.id).await?;
    Ok(Json(ReportResponse { conversation_id, report }))
}

fn start_speech(state: &AppState, context: &mut SessionContext, text: &str) -> bool {
    let cleaned = speech::clean_text(text);
    if cleaned.is_empty() {
        return false;
    }

    let llm = state.companion_llm().clone();
    let model = state.settings().speech().model.clone();
    let voice = state.settings().speech().voice.clone();
    context.speech.speak(move |cancel| async move {
        llm.speech(&model, &voice, &cleaned, &cancel).await
    })
}

fn ensure_speech_enabled(state: &AppState) -> Result<(), ApiError> {
    if state.settings().speech().enabled {
        Ok(())
    } else {
        Err(ApiError::ServiceUnavailable("Speech synthesis is disabled".to_string()))
    }
}

pub(crate) async fn speak(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    payload: Option<Json<SpeakRequest>>,
) -> Result<(StatusCode, Json<SpeechStatusResponse>), ApiError> {
    ensure_speech_enabled(&state)?;
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();

    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;

    let text = match payload.text {
        Some(text) => text,
        None => context
            .companion
            .turns()
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.clone())
            .ok_or_else(|| ApiError::NotFound("Nothing to speak yet".to_string()))?,
    };

    let started = start_speech(&state, &mut context, &text);
    let status = if started { StatusCode::ACCEPTED } else { StatusCode::CONFLICT };
    Ok((
        status,
        Json(SpeechStatusResponse {
            enabled: true,
            speaking: context.speech.is_speaking(),
            started: Some(started),
        }),
    ))
}

/// Audio of the last finished synthesis, or the current status while none is available.
pub(crate) async fn speech_audio(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Response, ApiError> {
    ensure_speech_enabled(&state)?;
    let context = session_context(&state, &account, session_id).await?;
    let context = context.lock().await;

    if let Some(audio) = context.speech.audio().await {
        return Ok(([(header::CONTENT_TYPE, "audio/mpeg")], Body::from(audio.as_ref().clone()))
            .into_response());
    }

    let speaking = context.speech.is_speaking();
    let status = if speaking { StatusCode::ACCEPTED } else { StatusCode::NOT_FOUND };
    Ok((status, Json(SpeechStatusResponse { enabled: true, speaking, started: None }))
        .into_response())
}

pub(crate) async fn stop_speech(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<SpeechStatusResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;

    let join_timeout = Duration::from_millis(state.settings().speech().join_timeout_ms);
    context.speech.stop(join_timeout).await;

    Ok(Json(SpeechStatusResponse {
        enabled: state.settings().speech().enabled,
        speaking: context.speech.is_speaking(),
        started: None,
    }))
}
