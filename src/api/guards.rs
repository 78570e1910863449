use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::Account;
use crate::repositories;
use crate::services::sessions::SharedContext;

pub(crate) struct CurrentUser(pub(crate) Account);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let account = repositories::accounts::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load account"))?;

        account.map(CurrentUser).ok_or(ApiError::Unauthorized("Account not found"))
    }
}

/// The caller's own session context; 404 when unknown, 403 when owned by someone else.
pub(crate) async fn session_context(
    state: &AppState,
    account: &Account,
    session_id: Uuid,
) -> Result<SharedContext, ApiError> {
    Ok(state.sessions().get(session_id, &account.id).await?)
}

/// Progress and registrations are only readable for student ids the account registered.
pub(crate) async fn require_student_access(
    state: &AppState,
    account: &Account,
    student_id: &str,
) -> Result<(), ApiError> {
    let owns = repositories::registrations::account_owns_student(state.db(), &account.id, student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check student access"))?;

    if owns {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Student is not registered under this account"))
    }
}
