use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{session_context, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::core::metrics;
use crate::repositories;
use crate::schemas::exam::{
    RecordResponseRequest, RegistrationResponse, StartExamRequest, StartExamResponse,
    SubmitResponse,
};
use crate::services::exam_session::{ExamError, ExamView};
use crate::services::scoring;

/// Registers the student and starts an exam on a random sample of the category.
pub(crate) async fn start(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(payload): Json<StartExamRequest>,
) -> Result<(StatusCode, Json<StartExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;
    if !context.exam.can_start() {
        return Err(ExamError::AlreadyStarted.into());
    }

    let category = state
        .question_bank()
        .category(payload.category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    let questions = state
        .question_bank()
        .sample_questions(category.id, state.settings().question_bank().sample_size)
        .await?;
    if questions.is_empty() {
        return Err(ExamError::EmptyQuestionSet.into());
    }

    let student_id = payload.student_id.trim();
    let registration = repositories::registrations::create(
        state.db(),
        repositories::registrations::CreateRegistration {
            id: &Uuid::new_v4().to_string(),
            account_id: &account.id,
            student_id,
            student_name: payload.student_name.trim(),
            email: payload.email.trim(),
            phone: payload.phone.as_deref().map(str::trim).filter(|phone| !phone.is_empty()),
            main_category: &category.name,
            sub_category: payload
                .sub_category
                .as_deref()
                .map(str::trim)
                .filter(|sub| !sub.is_empty()),
            difficulty: payload.difficulty,
            duration_minutes: payload.duration_minutes,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save registration"))?;

    let question_count = questions.len();
    context.exam.start(student_id, category, questions)?;
    context.student_id = Some(student_id.to_string());

    tracing::info!(
        session_id = %session_id,
        registration_id = %registration.id,
        questions = question_count,
        "Exam started"
    );

    Ok((
        StatusCode::CREATED,
        Json(StartExamResponse {
            registration: RegistrationResponse::from_db(registration),
            exam: context.exam.view(),
        }),
    ))
}

pub(crate) async fn view(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ExamView>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let context = context.lock().await;
    Ok(Json(context.exam.view()))
}

pub(crate) async fn next(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ExamView>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;
    context.exam.next()?;
    Ok(Json(context.exam.view()))
}

pub(crate) async fn previous(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ExamView>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;
    context.exam.previous()?;
    Ok(Json(context.exam.view()))
}

pub(crate) async fn record_response(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(payload): Json<RecordResponseRequest>,
) -> Result<Json<ExamView>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;
    context.exam.record_response(&payload.question_id, &payload.option)?;
    Ok(Json(context.exam.view()))
}

/// Scores the attempt and appends it to the student's progress. On failure the attempt stays open.
pub(crate) async fn submit(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<SubmitResponse>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;
    let attempt = context.exam.submit()?;

    let outcome = match scoring::evaluate_with_bank(state.question_bank(), &attempt.responses).await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            context.exam.resume();
            return Err(err.into());
        }
    };

    let record = match repositories::scores::record(
        state.db(),
        &attempt.student_id,
        &attempt.category.name,
        outcome.score as i32,
        outcome.total as i32,
    )
    .await
    {
        Ok(record) => record,
        Err(err) => {
            context.exam.resume();
            return Err(ApiError::internal(err, "Failed to record score"));
        }
    };

    context.exam.reset();
    metrics::record_exam_submitted(&attempt.category.name, outcome.score, outcome.total);
    tracing::info!(
        session_id = %session_id,
        student_id = %attempt.student_id,
        score = outcome.score,
        total = outcome.total,
        "Exam submitted"
    );

    Ok(Json(SubmitResponse {
        student_id: attempt.student_id,
        category: attempt.category.name,
        score: outcome.score,
        total: outcome.total,
        percent: record.percent(),
        review: outcome.review,
        recorded_at: format_primitive(record.recorded_at),
        exam: context.exam.view(),
    }))
}

pub(crate) async fn abandon(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<ExamView>, ApiError> {
    let context = session_context(&state, &account, session_id).await?;
    let mut context = context.lock().await;
    context.exam.abandon()?;
    tracing::info!(session_id = %session_id, "Exam abandoned");
    Ok(Json(context.exam.view()))
}
