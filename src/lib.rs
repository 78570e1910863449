pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    config::Settings,
    redis::RedisHandle,
    shutdown::Shutdown,
    state::{AppState, AppStateParts},
    telemetry,
};
use crate::services::question_bank::PgQuestionBank;
use crate::services::storage::StorageService;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;
    let question_bank_pool = db::init_question_bank_pool(&settings, &db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; rate limiting disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let storage = StorageService::from_settings(&settings).await?;
    let state = AppState::new(AppStateParts {
        settings,
        db: db_pool,
        question_bank: Arc::new(PgQuestionBank::new(question_bank_pool)),
        redis: redis.clone(),
        storage,
    })?;

    let shutdown = Shutdown::new();
    let session_settings = state.settings().session();
    let sweeper = tokio::spawn(tasks::sweeper::run(
        state.sessions().clone(),
        Duration::from_secs(session_settings.sweep_interval_seconds),
        Duration::from_secs(session_settings.idle_timeout_minutes * 60),
        shutdown.subscribe(),
    ));

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "MedMentor API listening"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().wait_for_signal())
        .await;

    shutdown.trigger();
    if let Err(err) = sweeper.await {
        tracing::error!(error = %err, "Session sweeper join failed");
    }

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
