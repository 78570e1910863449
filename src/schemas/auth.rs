use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Account;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccountResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) created_at: String,
}

impl AccountResponse {
    pub(crate) fn from_db(account: Account) -> Self {
        Self { id: account.id, email: account.email, created_at: format_primitive(account.created_at) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) account: AccountResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct LogoutResponse {
    pub(crate) sessions_closed: usize,
}

/// Emails are compared case-insensitively.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
