use sqlx::PgPool;

use crate::db::models::ScoreRecord;

const COLUMNS: &str = "id, student_id, category, score, total_questions, recorded_at";

/// Appends one row; the timestamp comes from the database clock.
pub(crate) async fn record(
    pool: &PgPool,
    student_id: &str,
    category: &str,
    score: i32,
    total_questions: i32,
) -> Result<ScoreRecord, sqlx::Error> {
    sqlx::query_as::<_, ScoreRecord>(&format!(
        "INSERT INTO exam_scores (student_id, category, score, total_questions)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(student_id)
    .bind(category)
    .bind(score)
    .bind(total_questions)
    .fetch_one(pool)
    .await
}

pub(crate) async fn history(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<ScoreRecord>, sqlx::Error> {
    sqlx::query_as::<_, ScoreRecord>(&format!(
        "SELECT {COLUMNS}
         FROM exam_scores
         WHERE student_id = $1
         ORDER BY recorded_at ASC, id ASC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}
