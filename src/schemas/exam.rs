use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::models::Registration;
use crate::db::types::DifficultyLevel;
use crate::services::exam_session::ExamView;
use crate::services::scoring::ReviewItem;

const MIN_DURATION_MINUTES: i32 = 30;
const MAX_DURATION_MINUTES: i32 = 180;
const DURATION_STEP_MINUTES: i32 = 30;

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) session_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StartExamRequest {
    #[serde(alias = "studentId")]
    #[validate(length(min = 1, max = 50, message = "student_id must be 1-50 characters"))]
    pub(crate) student_id: String,
    #[serde(alias = "studentName")]
    #[validate(length(min = 1, message = "student_name must not be empty"))]
    pub(crate) student_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(alias = "categoryId")]
    pub(crate) category_id: i64,
    #[serde(default)]
    #[serde(alias = "subCategory")]
    pub(crate) sub_category: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    #[serde(alias = "durationMinutes")]
    #[validate(custom(function = validate_duration))]
    pub(crate) duration_minutes: i32,
}

fn validate_duration(value: i32) -> Result<(), ValidationError> {
    let in_range = (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&value);
    if in_range && value % DURATION_STEP_MINUTES == 0 {
        return Ok(());
    }

    let mut error = ValidationError::new("duration");
    error.message = Some("duration_minutes must be 30-180 in steps of 30".into());
    Err(error)
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) main_category: String,
    pub(crate) sub_category: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) duration_minutes: i32,
    pub(crate) created_at: String,
}

impl RegistrationResponse {
    pub(crate) fn from_db(registration: Registration) -> Self {
        Self {
            id: registration.id,
            student_id: registration.student_id,
            student_name: registration.student_name,
            email: registration.email,
            phone: registration.phone,
            main_category: registration.main_category,
            sub_category: registration.sub_category,
            difficulty: registration.difficulty,
            duration_minutes: registration.duration_minutes,
            created_at: format_primitive(registration.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartExamResponse {
    pub(crate) registration: RegistrationResponse,
    pub(crate) exam: ExamView,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RecordResponseRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    pub(crate) option: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) student_id: String,
    pub(crate) category: String,
    pub(crate) score: u32,
    pub(crate) total: u32,
    pub(crate) percent: f64,
    pub(crate) review: Vec<ReviewItem>,
    pub(crate) recorded_at: String,
    pub(crate) exam: ExamView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(duration: i32) -> StartExamRequest {
        serde_json::from_value(json!({
            "student_id": "S-100",
            "student_name": "Asha",
            "email": "asha@example.com",
            "category_id": 3,
            "difficulty": "beginner",
            "duration_minutes": duration,
        }))
        .expect("request")
    }

    #[test]
    fn duration_must_be_a_step_of_thirty() {
        for ok in [30, 60, 90, 120, 150, 180] {
            assert!(request(ok).validate().is_ok(), "{ok} should be accepted");
        }
        for bad in [0, 29, 45, 210] {
            assert!(request(bad).validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let parsed: StartExamRequest = serde_json::from_value(json!({
            "studentId": "S-1",
            "studentName": "Lee",
            "email": "lee@example.com",
            "categoryId": 1,
            "subCategory": "ECG",
            "difficulty": "advanced",
            "durationMinutes": 60,
        }))
        .expect("request");
        assert_eq!(parsed.sub_category.as_deref(), Some("ECG"));
        assert_eq!(parsed.difficulty, DifficultyLevel::Advanced);
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let parsed = serde_json::from_value::<StartExamRequest>(json!({
            "student_id": "S-1",
            "student_name": "Lee",
            "email": "lee@example.com",
            "category_id": 1,
            "difficulty": "expert",
            "duration_minutes": 60,
        }));
        assert!(parsed.is_err());
    }
}
