use std::collections::HashMap;

use serde::Serialize;

use crate::services::question_bank::{QuestionBank, QuestionBankError};

/// Stands in for a question with no correct-answer record. Never equals a selected option.
pub(crate) const MISSING_ANSWER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ReviewItem {
    pub(crate) question_id: String,
    pub(crate) selected: String,
    pub(crate) correct: String,
    pub(crate) matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ScoreOutcome {
    pub(crate) score: u32,
    pub(crate) total: u32,
    pub(crate) review: Vec<ReviewItem>,
}

/// Exact string comparison of each response against the correct-answer lookup.
pub(crate) fn evaluate(
    responses: &[(String, String)],
    correct: &HashMap<String, String>,
) -> ScoreOutcome {
    let review: Vec<ReviewItem> = responses
        .iter()
        .map(|(question_id, selected)| {
            let expected = correct.get(question_id).map(String::as_str);
            let matched = expected.is_some_and(|answer| answer == selected);
            ReviewItem {
                question_id: question_id.clone(),
                selected: selected.clone(),
                correct: expected.unwrap_or(MISSING_ANSWER).to_string(),
                matched,
            }
        })
        .collect();

    let score = review.iter().filter(|item| item.matched).count() as u32;
    ScoreOutcome { score, total: review.len() as u32, review }
}

/// Scores an attempt with one batched correct-answer lookup.
pub(crate) async fn evaluate_with_bank(
    bank: &dyn QuestionBank,
    responses: &[(String, String)],
) -> Result<ScoreOutcome, QuestionBankError> {
    let ids: Vec<String> = responses.iter().map(|(question_id, _)| question_id.clone()).collect();
    let correct = bank.correct_answers(&ids).await?;
    Ok(evaluate(responses, &correct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::question_bank::memory::InMemoryQuestionBank;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(id, option)| (id.to_string(), option.to_string())).collect()
    }

    fn lookup(items: &[(&str, &str)]) -> HashMap<String, String> {
        items.iter().map(|(id, option)| (id.to_string(), option.to_string())).collect()
    }

    #[test]
    fn counts_exact_matches() {
        let outcome = evaluate(
            &pairs(&[("1", "Paris"), ("2", "Rome"), ("3", "Oslo")]),
            &lookup(&[("1", "Paris"), ("2", "Madrid"), ("3", "Oslo")]),
        );
        assert_eq!(outcome.score, 2);
        assert_eq!(outcome.total, 3);
        assert!(!outcome.review[1].matched);
        assert_eq!(outcome.review[1].correct, "Madrid");
    }

    #[test]
    fn match_is_case_and_whitespace_sensitive() {
        let correct = lookup(&[("1", "Paris")]);
        assert_eq!(evaluate(&pairs(&[("1", "Paris ")]), &correct).score, 0);
        assert_eq!(evaluate(&pairs(&[("1", "paris")]), &correct).score, 0);
    }

    #[test]
    fn missing_correct_answer_uses_sentinel() {
        let outcome = evaluate(&pairs(&[("9", "N/A")]), &HashMap::new());
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.review[0].correct, MISSING_ANSWER);
    }

    #[test]
    fn score_never_exceeds_total() {
        let correct = lookup(&[("1", "A"), ("2", "B"), ("3", "C"), ("4", "D")]);
        let options = ["A", "B", "C", "D"];
        for mask in 0..16u32 {
            let responses: Vec<(String, String)> = (0..4)
                .map(|i| {
                    let option = if mask & (1 << i) != 0 { options[i] } else { "X" };
                    ((i + 1).to_string(), option.to_string())
                })
                .collect();
            let outcome = evaluate(&responses, &correct);
            assert_eq!(outcome.total, 4);
            assert_eq!(outcome.score, mask.count_ones());
            assert!(outcome.score <= outcome.total);
        }
    }

    #[test]
    fn empty_attempt_scores_zero_of_zero() {
        let outcome = evaluate(&[], &HashMap::new());
        assert_eq!((outcome.score, outcome.total), (0, 0));
    }

    #[tokio::test]
    async fn bank_lookup_feeds_evaluation() {
        let bank = InMemoryQuestionBank::default()
            .with_category(1, "Anatomy")
            .with_question(1, "10", "Largest bone?", &["Femur", "Tibia"], "Femur")
            .with_question(1, "11", "Smallest bone?", &["Stapes", "Incus"], "Stapes");

        let outcome =
            evaluate_with_bank(&bank, &pairs(&[("10", "Femur"), ("11", "Incus")])).await.expect("score");
        assert_eq!((outcome.score, outcome.total), (1, 2));
    }
}
