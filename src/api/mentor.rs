use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{session_context, CurrentUser};
use crate::api::validation::validate_document_upload;
use crate::core::state::AppState;
use crate::schemas::chat::{ConversationResponse, DocumentResponse, MessageRequest, MessageResponse};
use crate::services::conversation::WindowPolicy;
use crate::services::{documents, mentor, storage};

pub(crate) async fn conversation(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ConversationResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let context = context.lock().await;
    Ok(Json(ConversationResponse {
        messages: context.mentor.turns().to_vec(),
        document_summary: context.document_summary.clone(),
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

    let reply = mentor::ask(
        state.mentor_llm(),
        WindowPolicy::from_settings(state.settings().chat()),
        &mut context.mentor,
        context.document_summary.as_deref(),
        payload.text.trim(),
    )
    .await?;

    Ok(Json(MessageResponse { reply, speaking: None }))
}

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

async fn read_document_field(
    multipart: &mut Multipart,
    max_upload_size_mb: u64,
) -> Result<UploadedFile, ApiError> {
    let max_bytes = max_upload_size_mb * 1024 * 1024;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;
        let content_type = field.content_type().unwrap_or_default().to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File size exceeds {max_upload_size_mb}MB limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile { filename, content_type, bytes });
    }

    Err(ApiError::BadRequest("Missing file field".to_string()))
}

/// Extracts text from a txt, md, pdf or docx upload, stores it (optionally) and summarises it.
/// The summary feeds later mentor turns.
pub(crate) async fn upload_document(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;

    let settings = state.settings().storage();
    let upload = read_document_field(&mut multipart, settings.max_upload_size_mb).await?;
    validate_document_upload(
        &upload.filename,
        &upload.content_type,
        &settings.allowed_document_extensions,
    )?;

    let filename = documents::sanitized_filename(&upload.filename);
    let UploadedFile { filename: original_name, content_type, bytes } = upload;
    let allowed = settings.allowed_document_extensions.clone();
    let (text, bytes) = tokio::task::spawn_blocking(move || {
        let text = documents::extract_text(&original_name, &bytes, &allowed);
        (text, bytes)
    })
    .await
    .map_err(|e| ApiError::internal(e, "Failed to read document"))?;
    let text = text?;

    let stored = match state.storage() {
        Some(storage_service) => {
            let key = storage::document_key(session_id, &filename);
            let content_type = if content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                content_type
            };
            let stored = storage_service
                .upload_bytes(&key, &content_type, bytes)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to store document"))?;
            Some(stored)
        }
        None => None,
    };

    let summary = documents::summarize(
        state.mentor_llm(),
        &text,
        state.settings().chat().summary_input_chars,
    )
    .await?;

    context.lock().await.document_summary = Some(summary.clone());
    tracing::info!(
        session_id = %session_id,
        filename = %filename,
        characters = text.chars().count(),
        stored = stored.is_some(),
        "Document summarised"
    );

    Ok(Json(DocumentResponse {
        filename,
        characters: text.chars().count(),
        summary,
        storage_key: stored.as_ref().map(|object| object.key.clone()),
        sha256: stored.map(|object| object.sha256),
    }))
}
