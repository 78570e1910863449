use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::ChatTurn;
use crate::services::llm::ChatMessage;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MessageRequest {
    #[validate(length(min = 1, max = 4000, message = "text must be 1-4000 characters"))]
    pub(crate) text: String,
    /// Companion only: also start speech synthesis of the reply.
    #[serde(default)]
    pub(crate) speak: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) speaking: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConversationResponse {
    pub(crate) messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) document_summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentResponse {
    pub(crate) filename: String,
    pub(crate) characters: usize,
    pub(crate) summary: String,
    pub(crate) storage_key: Option<String>,
    pub(crate) sha256: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatTurnResponse {
    pub(crate) user_input: String,
    pub(crate) ai_response: String,
    pub(crate) created_at: String,
}

impl ChatTurnResponse {
    pub(crate) fn from_db(turn: ChatTurn) -> Self {
        Self {
            user_input: turn.user_input,
            ai_response: turn.ai_response,
            created_at: format_primitive(turn.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryResponse {
    pub(crate) conversation_id: Uuid,
    pub(crate) turns: Vec<ChatTurnResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) conversation_id: Uuid,
    pub(crate) report: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SpeakRequest {
    /// Defaults to the latest companion reply.
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeechStatusResponse {
    pub(crate) enabled: bool,
    pub(crate) speaking: bool,
    pub(crate) started: Option<bool>,
}
