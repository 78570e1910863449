pub(crate) mod accounts;
pub(crate) mod chat_history;
pub(crate) mod question_bank;
pub(crate) mod registrations;
pub(crate) mod scores;

const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}
