use sqlx::FromRow;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::types::DifficultyLevel;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Account {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Registration {
    pub(crate) id: String,
    pub(crate) account_id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) main_category: String,
    pub(crate) sub_category: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) duration_minutes: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ScoreRecord {
    pub(crate) id: i64,
    pub(crate) student_id: String,
    pub(crate) category: String,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) recorded_at: PrimitiveDateTime,
}

impl ScoreRecord {
    pub(crate) fn percent(&self) -> f64 {
        if self.total_questions <= 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_questions) * 100.0
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ChatTurn {
    pub(crate) id: i64,
    pub(crate) conversation_id: Uuid,
    pub(crate) account_id: String,
    pub(crate) user_input: String,
    pub(crate) ai_response: String,
    pub(crate) created_at: PrimitiveDateTime,
}
