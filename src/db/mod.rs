pub(crate) mod models;
pub(crate) mod types;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};

use crate::core::config::Settings;

const APPLICATION_NAME: &str = "medmentor";

pub(crate) async fn init_pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    connect(&settings.database().database_url(), 20).await
}

/// The question bank is read-only and may live in another database.
pub(crate) async fn init_question_bank_pool(
    settings: &Settings,
    main: &PgPool,
) -> Result<PgPool, sqlx::Error> {
    match &settings.question_bank().url {
        Some(url) => connect(url, 5).await,
        None => Ok(main.clone()),
    }
}

async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let connect_options: PgConnectOptions = database_url.parse()?;
    let connect_options = connect_options
        .application_name(APPLICATION_NAME)
        .log_statements(tracing::log::LevelFilter::Off);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
}

pub(crate) async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
