//! Per-session exam walk-through: question sequencing, response capture and submission.
//!
//! The controller is a plain state machine. It never talks to the question bank or the
//! database; callers fetch the question set, hand it to [`ExamSession::start`] and score the
//! [`Attempt`] returned by [`ExamSession::submit`].

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::services::question_bank::{Category, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExamState {
    NotStarted,
    InProgress { index: usize },
    Submitted,
}

impl ExamState {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ExamState::NotStarted => "not_started",
            ExamState::InProgress { .. } => "in_progress",
            ExamState::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ExamError {
    #[error("No questions found for this category")]
    EmptyQuestionSet,
    #[error("An exam is already in progress")]
    AlreadyStarted,
    #[error("No exam is in progress")]
    NotInProgress,
    #[error("Question {0} is not part of this exam")]
    UnknownQuestion(String),
    #[error("Option is not one of the choices for question {0}")]
    UnknownOption(String),
    #[error("Submit is only available on the last question")]
    NotAtLastQuestion,
    #[error("Please answer all questions before submitting ({} unanswered)", missing.len())]
    Unanswered { missing: Vec<String> },
}

/// One completed pass through the question set, in question order.
#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    pub(crate) student_id: String,
    pub(crate) category: Category,
    pub(crate) responses: Vec<(String, String)>,
    pub(crate) submitted_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct ActiveExam {
    student_id: String,
    category: Category,
    questions: Vec<Question>,
    responses: HashMap<String, String>,
}

impl ActiveExam {
    fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }

    fn missing(&self) -> Vec<String> {
        self.questions
            .iter()
            .filter(|question| !self.responses.contains_key(&question.id))
            .map(|question| question.id.clone())
            .collect()
    }

    fn ordered_responses(&self) -> Vec<(String, String)> {
        self.questions
            .iter()
            .filter_map(|question| {
                self.responses
                    .get(&question.id)
                    .map(|option| (question.id.clone(), option.clone()))
            })
            .collect()
    }
}

/// Client-facing snapshot of the exam. Never exposes correct answers.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExamView {
    pub(crate) state: &'static str,
    pub(crate) category: Option<Category>,
    pub(crate) student_id: Option<String>,
    pub(crate) index: Option<usize>,
    pub(crate) total: usize,
    pub(crate) answered: usize,
    pub(crate) question: Option<QuestionView>,
    pub(crate) can_go_back: bool,
    pub(crate) can_go_forward: bool,
    pub(crate) can_submit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) number: usize,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) selected: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ExamSession {
    state: ExamState,
    active: Option<ActiveExam>,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamSession {
    pub(crate) fn new() -> Self {
        Self { state: ExamState::NotStarted, active: None }
    }

    pub(crate) fn state(&self) -> ExamState {
        self.state
    }

    /// A submission whose scoring never finished does not block a new exam.
    pub(crate) fn can_start(&self) -> bool {
        !matches!(self.state, ExamState::InProgress { .. })
    }

    pub(crate) fn start(
        &mut self,
        student_id: &str,
        category: Category,
        questions: Vec<Question>,
    ) -> Result<(), ExamError> {
        if !self.can_start() {
            return Err(ExamError::AlreadyStarted);
        }
        if questions.is_empty() {
            return Err(ExamError::EmptyQuestionSet);
        }

        self.active = Some(ActiveExam {
            student_id: student_id.to_string(),
            category,
            questions,
            responses: HashMap::new(),
        });
        self.state = ExamState::InProgress { index: 0 };
        Ok(())
    }

    fn in_progress(&self) -> Result<(usize, &ActiveExam), ExamError> {
        match (self.state, self.active.as_ref()) {
            (ExamState::InProgress { index }, Some(active)) => Ok((index, active)),
            _ => Err(ExamError::NotInProgress),
        }
    }

    /// Moves forward one question; stays put on the last one.
    pub(crate) fn next(&mut self) -> Result<usize, ExamError> {
        let (index, active) = self.in_progress()?;
        let last = active.questions.len() - 1;
        let index = (index + 1).min(last);
        self.state = ExamState::InProgress { index };
        Ok(index)
    }

    /// Moves back one question; stays put on the first one.
    pub(crate) fn previous(&mut self) -> Result<usize, ExamError> {
        let (index, _) = self.in_progress()?;
        let index = index.saturating_sub(1);
        self.state = ExamState::InProgress { index };
        Ok(index)
    }

    /// Records (or overwrites) the answer to any question of the active set.
    pub(crate) fn record_response(
        &mut self,
        question_id: &str,
        option: &str,
    ) -> Result<(), ExamError> {
        let (_, active) = self.in_progress()?;
        let question = active
            .question(question_id)
            .ok_or_else(|| ExamError::UnknownQuestion(question_id.to_string()))?;
        if !question.options.iter().any(|candidate| candidate == option) {
            return Err(ExamError::UnknownOption(question_id.to_string()));
        }

        if let Some(active) = self.active.as_mut() {
            active.responses.insert(question_id.to_string(), option.to_string());
        }
        Ok(())
    }

    /// Validates and closes the attempt. On error nothing changes.
    pub(crate) fn submit(&mut self) -> Result<Attempt, ExamError> {
        let (index, active) = self.in_progress()?;
        if index + 1 != active.questions.len() {
            return Err(ExamError::NotAtLastQuestion);
        }

        let missing = active.missing();
        if !missing.is_empty() {
            return Err(ExamError::Unanswered { missing });
        }

        let attempt = Attempt {
            student_id: active.student_id.clone(),
            category: active.category.clone(),
            responses: active.ordered_responses(),
            submitted_at: OffsetDateTime::now_utc(),
        };
        self.state = ExamState::Submitted;
        Ok(attempt)
    }

    /// Returns to `NotStarted` after a scored submission.
    pub(crate) fn reset(&mut self) {
        self.state = ExamState::NotStarted;
        self.active = None;
    }

    /// Reopens a submitted attempt on its last question, e.g. when scoring failed.
    pub(crate) fn resume(&mut self) {
        if self.state != ExamState::Submitted {
            return;
        }
        match self.active.as_ref() {
            Some(active) => {
                self.state = ExamState::InProgress { index: active.questions.len() - 1 };
            }
            None => self.state = ExamState::NotStarted,
        }
    }

    /// Drops an unfinished exam, or a submission left unscored.
    pub(crate) fn abandon(&mut self) -> Result<(), ExamError> {
        match self.state {
            ExamState::InProgress { .. } | ExamState::Submitted => {
                self.reset();
                Ok(())
            }
            ExamState::NotStarted => Err(ExamError::NotInProgress),
        }
    }

    pub(crate) fn view(&self) -> ExamView {
        let Ok((index, active)) = self.in_progress() else {
            return ExamView {
                state: self.state.label(),
                category: None,
                student_id: None,
                index: None,
                total: 0,
                answered: 0,
                question: None,
                can_go_back: false,
                can_go_forward: false,
                can_submit: false,
            };
        };

        let total = active.questions.len();
        let current = &active.questions[index];
        let is_last = index + 1 == total;

        ExamView {
            state: self.state.label(),
            category: Some(active.category.clone()),
            student_id: Some(active.student_id.clone()),
            index: Some(index),
            total,
            answered: active.responses.len(),
            question: Some(QuestionView {
                id: current.id.clone(),
                number: index + 1,
                text: current.text.clone(),
                options: current.options.clone(),
                selected: active.responses.get(&current.id).cloned(),
            }),
            can_go_back: index > 0,
            can_go_forward: !is_last,
            can_submit: is_last,
        }
    }
}
