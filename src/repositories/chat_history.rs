use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::ChatTurn;

const COLUMNS: &str = "id, conversation_id, account_id, user_input, ai_response, created_at";

pub(crate) async fn append(
    pool: &PgPool,
    conversation_id: Uuid,
    account_id: &str,
    user_input: &str,
    ai_response: &str,
) -> Result<ChatTurn, sqlx::Error> {
    sqlx::query_as::<_, ChatTurn>(&format!(
        "INSERT INTO chat_history (conversation_id, account_id, user_input, ai_response)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(conversation_id)
    .bind(account_id)
    .bind(user_input)
    .bind(ai_response)
    .fetch_one(pool)
    .await
}

/// Chronological turns of one conversation, restricted to its owner.
pub(crate) async fn list_for_conversation(
    pool: &PgPool,
    conversation_id: Uuid,
    account_id: &str,
) -> Result<Vec<ChatTurn>, sqlx::Error> {
    sqlx::query_as::<_, ChatTurn>(&format!(
        "SELECT {COLUMNS}
         FROM chat_history
         WHERE conversation_id = $1 AND account_id = $2
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(conversation_id)
    .bind(account_id)
    .fetch_all(pool)
    .await
}
