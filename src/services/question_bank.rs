use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::repositories;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Category {
    pub(crate) id: i64,
    pub(crate) name: String,
}

/// A multiple-choice question as shown to the student. The correct option stays in the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
}

#[derive(Debug, Error)]
pub(crate) enum QuestionBankError {
    #[error("question bank query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read-only access to the external question bank.
#[async_trait]
pub(crate) trait QuestionBank: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, QuestionBankError>;

    async fn category(&self, category_id: i64) -> Result<Option<Category>, QuestionBankError>;

    /// Random sample of up to `limit` questions of the category, options in bank order.
    async fn sample_questions(
        &self,
        category_id: i64,
        limit: u32,
    ) -> Result<Vec<Question>, QuestionBankError>;

    /// One batched lookup of question id -> correct option text.
    async fn correct_answers(
        &self,
        question_ids: &[String],
    ) -> Result<HashMap<String, String>, QuestionBankError>;
}

pub(crate) struct PgQuestionBank {
    pool: PgPool,
}

impl PgQuestionBank {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionBank for PgQuestionBank {
    async fn categories(&self) -> Result<Vec<Category>, QuestionBankError> {
        let rows = repositories::question_bank::active_categories(&self.pool).await?;
        Ok(rows.into_iter().map(|row| Category { id: row.id, name: row.name }).collect())
    }

    async fn category(&self, category_id: i64) -> Result<Option<Category>, QuestionBankError> {
        let row = repositories::question_bank::find_active_category(&self.pool, category_id).await?;
        Ok(row.map(|row| Category { id: row.id, name: row.name }))
    }

    async fn sample_questions(
        &self,
        category_id: i64,
        limit: u32,
    ) -> Result<Vec<Question>, QuestionBankError> {
        let rows =
            repositories::question_bank::random_questions(&self.pool, category_id, i64::from(limit))
                .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let option_rows = repositories::question_bank::options_for(&self.pool, &ids).await?;

        let mut options_by_question: HashMap<i64, Vec<String>> = HashMap::new();
        for option in option_rows {
            options_by_question
                .entry(option.question_id)
                .or_default()
                .push(plain_text(&option.option_text));
        }

        Ok(rows
            .into_iter()
            .map(|row| Question {
                id: row.id.to_string(),
                text: plain_text(&row.question),
                options: options_by_question.remove(&row.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn correct_answers(
        &self,
        question_ids: &[String],
    ) -> Result<HashMap<String, String>, QuestionBankError> {
        // Ids the bank cannot hold never match and fall through to the missing-answer sentinel.
        let ids: Vec<i64> = question_ids
            .iter()
            .filter_map(|id| id.parse::<i64>().ok())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let rows = repositories::question_bank::correct_options_for(&self.pool, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.question_id.to_string(), plain_text(&row.option_text)))
            .collect())
    }
}

/// Reduces a stored HTML fragment to the text a browser would show.
pub(crate) fn plain_text(html: &str) -> String {
    let stripped = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(html)
        .to_string();
    // ammonia re-escapes the text it keeps.
    html_escape::decode_html_entities(&stripped).trim().to_string()
}


#[cfg(test)]
mod tests {
    use super::plain_text;

    #[test]
    fn plain_text_strips_markup() {
        assert_eq!(plain_text("<p>Which nerve is <b>injured</b>?</p>"), "Which nerve is injured?");
    }

    #[test]
    fn plain_text_drops_script_content() {
        assert_eq!(plain_text("Safe<script>alert(1)</script> text"), "Safe text");
    }

    #[test]
    fn plain_text_keeps_reserved_characters() {
        assert_eq!(plain_text("<span>K+ &lt; 3.5 &amp; Na+ &gt; 145</span>"), "K+ < 3.5 & Na+ > 145");
        assert_eq!(plain_text("  Plain answer "), "Plain answer");
    }

    #[test]
    fn plain_text_decodes_named_and_numeric_entities() {
        assert_eq!(plain_text("<p>Na&nbsp;&#8805;&nbsp;145 &quot;mmol&quot;</p>"), "Na\u{a0}≥\u{a0}145 \"mmol\"");
    }
}
