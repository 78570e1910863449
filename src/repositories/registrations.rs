use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Registration;
use crate::db::types::DifficultyLevel;

const COLUMNS: &str = "\
    id, account_id, student_id, student_name, email, phone, main_category, \
    sub_category, difficulty, duration_minutes, created_at";

pub(crate) struct CreateRegistration<'a> {
    pub id: &'a str,
    pub account_id: &'a str,
    pub student_id: &'a str,
    pub student_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub main_category: &'a str,
    pub sub_category: Option<&'a str>,
    pub difficulty: DifficultyLevel,
    pub duration_minutes: i32,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateRegistration<'_>,
) -> Result<Registration, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let registration = sqlx::query_as::<_, Registration>(&format!(
        "INSERT INTO exam_registrations (
            id, account_id, student_id, student_name, email, phone,
            main_category, sub_category, difficulty, duration_minutes, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.account_id)
    .bind(params.student_id)
    .bind(params.student_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.main_category)
    .bind(params.sub_category)
    .bind(params.difficulty)
    .bind(params.duration_minutes)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(registration)
}

pub(crate) async fn account_owns_student(
    pool: &PgPool,
    account_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM exam_registrations WHERE account_id = $1 AND student_id = $2
        )",
    )
    .bind(account_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_account(
    pool: &PgPool,
    account_id: &str,
) -> Result<Vec<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(&format!(
        "SELECT {COLUMNS} FROM exam_registrations
         WHERE account_id = $1
         ORDER BY created_at DESC"
    ))
    .bind(account_id)
    .fetch_all(pool)
    .await
}
