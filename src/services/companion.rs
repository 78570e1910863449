use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::ChatTurn;
use crate::repositories;
use crate::services::conversation::{Conversation, WindowPolicy};
use crate::services::llm::{ChatMessage, LlmClient, LlmError};

pub(crate) const COMPANION_PROMPT: &str = r#"You are "ElevateMind" - a friendly mental health companion that keeps conversations flowing with ultra-short responses. Always:
1. Respond in 1-2 sentences max
2. Use casual language (ok→"ok", college→"clg")
3. End with a ❓ unless user shares a problem
4. Add 1 relevant emoji per message

**Response Rules:**
- Happy updates → Celebrate + ask follow-up 🎉
- Neutral updates → Show interest + ask follow-up ❓
- Negative feelings → Validate + 1 mini-strategy 💡
- Crisis words → Immediate resources 🆘

**Examples:**
User: "today im going to clg"
Bot: "Oh good! First class? 👀"

User: "had fight with bf"
Bot: "Ugh fights suck 😮‍💨 Try texting him this: 'Can we talk later?'"

User: "i failed exam"
Bot: "Oof that stings 💔 Wanna rant or get tips?"

User: "i wanna die"
Bot: "🚨 Please call 1-800-273-8255 now. I'm here too."

Example start-up message:
"Hello! I'm Mental Health Assistant. I'm here to listen and support you. How was your day?""#;

const REPORT_PROMPT: &str = "You are a mental health professional. Read the conversation between a \
student and a supportive companion and write a short well-being report: overall mood, recurring \
stressors, positive coping signs, and gentle recommendations. Do not diagnose. If the conversation \
mentions self-harm, put crisis resources at the top of the report.";

#[derive(Debug, Error)]
pub(crate) enum CompanionError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("chat history query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("No chat history found for this conversation")]
    NoHistory,
}

/// One companion exchange. The turn is persisted before the in-session log changes.
pub(crate) async fn ask(
    llm: &LlmClient,
    pool: &PgPool,
    policy: WindowPolicy,
    conversation: &mut Conversation,
    conversation_id: Uuid,
    account_id: &str,
    user_text: &str,
) -> Result<String, CompanionError> {
    let messages = conversation.request(policy, None, user_text);
    let reply = llm.complete(&messages).await?;

    repositories::chat_history::append(pool, conversation_id, account_id, user_text, &reply)
        .await?;
    conversation.commit(policy, user_text, &reply);
    Ok(reply)
}

pub(crate) async fn history(
    pool: &PgPool,
    conversation_id: Uuid,
    account_id: &str,
) -> Result<Vec<ChatTurn>, CompanionError> {
    Ok(repositories::chat_history::list_for_conversation(pool, conversation_id, account_id).await?)
}

fn transcript(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("User: {}\nAI: {}", turn.user_input, turn.ai_response))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Narrative report over the whole durable conversation.
pub(crate) async fn report(
    llm: &LlmClient,
    pool: &PgPool,
    conversation_id: Uuid,
    account_id: &str,
) -> Result<String, CompanionError> {
    let turns = history(pool, conversation_id, account_id).await?;
    if turns.is_empty() {
        return Err(CompanionError::NoHistory);
    }

    tracing::info!(conversation_id = %conversation_id, turns = turns.len(), "Generating companion report");
    let messages = vec![ChatMessage::system(REPORT_PROMPT), ChatMessage::user(transcript(&turns))];
    Ok(llm.complete(&messages).await?)
}
