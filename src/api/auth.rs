use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_password_len;
use crate::core::redis::RateLimit;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::auth::{
    normalize_email, AccountResponse, LoginRequest, LogoutResponse, SignupRequest, TokenResponse,
};

const AUTH_RATE_LIMIT: RateLimit = RateLimit { max_hits: 10, window_seconds: 60 };

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn enforce_rate_limit(
    state: &AppState,
    action: &str,
    email: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let key = format!("rl:{action}:{email}");
    let allowed = state.redis().allow(&key, AUTH_RATE_LIMIT).await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Rate limit check failed; allowing request");
        true
    });

    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

/// Creates an account. Does not log the user in.
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_password_len(&payload.password)?;
    let email = normalize_email(&payload.email);

    enforce_rate_limit(&state, "signup", &email, "Too many signup attempts, try again later")
        .await?;

    let existing = repositories::accounts::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing account"))?;
    if existing {
        return Err(ApiError::Conflict("An account with this email already exists".to_string()));
    }

    let password_hash = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let account = repositories::accounts::create(
        state.db(),
        repositories::accounts::CreateAccount {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            password_hash,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if repositories::is_unique_violation(&e) {
            ApiError::Conflict("An account with this email already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create account")
        }
    })?;

    tracing::info!(account_id = %account.id, "Account created");
    Ok((StatusCode::CREATED, Json(AccountResponse::from_db(account))))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    enforce_rate_limit(&state, "login", &email, "Too many login attempts, try again later").await?;

    let account = repositories::accounts::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load account"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))?;

    let verified = security::verify_password(&payload.password, &account.password_hash)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    let token = security::create_access_token(&account.id, &account.email, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        account: AccountResponse::from_db(account),
    }))
}

/// Drops every in-memory session of the account. Tokens stay valid until they expire.
async fn logout(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Json<LogoutResponse> {
    let sessions_closed = state.sessions().remove_all_for(&account.id).await;
    crate::core::metrics::set_active_sessions(state.sessions().len().await);
    tracing::info!(account_id = %account.id, sessions_closed, "Logged out");
    Json(LogoutResponse { sessions_closed })
}

async fn me(CurrentUser(account): CurrentUser) -> Json<AccountResponse> {
    Json(AccountResponse::from_db(account))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::repositories;
    use crate::test_support::{self, json_request, read_json};

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let (app, _guard) = test_support::lazy_app().await;
        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/auth/me", None, None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
    }

    #[tokio::test]
    async fn signup_rejects_short_password_before_touching_db() {
        let (app, _guard) = test_support::lazy_app().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/signup",
                None,
                Some(json!({"email": "a@example.com", "password": "short"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["detail"], "Password must be at least 8 characters long");
    }

    #[tokio::test]
    async fn signup_rejects_invalid_email() {
        let (app, _guard) = test_support::lazy_app().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/signup",
                None,
                Some(json!({"email": "nope", "password": "long-enough"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict_without_insert() {
        let ctx = test_support::setup_test_context().await;
        let payload = json!({"email": "dup@example.com", "password": "password123"});

        let first = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/auth/signup", None, Some(payload.clone())))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::CREATED);
        let body = read_json(first).await;
        assert!(body.get("access_token").is_none());

        let before = repositories::accounts::count(ctx.state.db()).await.expect("count");
        let second = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/signup",
                None,
                Some(json!({"email": "DUP@example.com", "password": "password123"})),
            ))
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = read_json(second).await;
        assert!(body.get("access_token").is_none());
        let after = repositories::accounts::count(ctx.state.db()).await.expect("count");
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn login_returns_token_and_logout_drops_sessions() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_account(&ctx.state, "login@example.com", "password123").await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "login@example.com", "password": "password123"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let token = read_json(response).await["access_token"].as_str().expect("token").to_string();

        let created = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/sessions", Some(&token), None))
            .await
            .expect("response");
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(ctx.state.sessions().len().await, 1);

        let logout = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/auth/logout", Some(&token), None))
            .await
            .expect("response");
        assert_eq!(logout.status(), StatusCode::OK);
        assert_eq!(read_json(logout).await["sessions_closed"], 1);
        assert_eq!(ctx.state.sessions().len().await, 0);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_account(&ctx.state, "wrong@example.com", "password123").await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "wrong@example.com", "password": "password124"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
