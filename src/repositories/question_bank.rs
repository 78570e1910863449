use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct CategoryRow {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) id: i64,
    pub(crate) question: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct OptionRow {
    pub(crate) question_id: i64,
    pub(crate) option_text: String,
}

pub(crate) async fn active_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name FROM category WHERE status = 1 ORDER BY name ASC, id ASC",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_active_category(
    pool: &PgPool,
    category_id: i64,
) -> Result<Option<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>("SELECT id, name FROM category WHERE id = $1 AND status = 1")
        .bind(category_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn random_questions(
    pool: &PgPool,
    category_id: i64,
    limit: i64,
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(
        "SELECT qb.id, qb.question
         FROM question_bank qb
         WHERE qb.id IN (SELECT qc.question_id FROM question_category qc WHERE qc.category_id = $1)
         ORDER BY random()
         LIMIT $2",
    )
    .bind(category_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn options_for(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<Vec<OptionRow>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, OptionRow>(
        "SELECT question_id, option_text
         FROM question_options
         WHERE question_id = ANY($1)
         ORDER BY question_id ASC, id ASC",
    )
    .bind(question_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn correct_options_for(
    pool: &PgPool,
    question_ids: &[i64],
) -> Result<Vec<OptionRow>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, OptionRow>(
        "SELECT question_id, option_text
         FROM question_options
         WHERE question_id = ANY($1) AND is_correct = 1
         ORDER BY question_id ASC, id ASC",
    )
    .bind(question_ids)
    .fetch_all(pool)
    .await
}
