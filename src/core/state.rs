use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::llm::LlmClient;
use crate::services::question_bank::QuestionBank;
use crate::services::sessions::SessionStore;
use crate::services::storage::StorageService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    question_bank: Arc<dyn QuestionBank>,
    redis: RedisHandle,
    storage: Option<StorageService>,
    sessions: SessionStore,
    mentor_llm: LlmClient,
    companion_llm: LlmClient,
}

pub(crate) struct AppStateParts {
    pub(crate) settings: Settings,
    pub(crate) db: PgPool,
    pub(crate) question_bank: Arc<dyn QuestionBank>,
    pub(crate) redis: RedisHandle,
    pub(crate) storage: Option<StorageService>,
}

impl AppState {
    pub(crate) fn new(parts: AppStateParts) -> anyhow::Result<Self> {
        let AppStateParts { settings, db, question_bank, redis, storage } = parts;
        let llm = settings.llm();
        let mentor_llm = LlmClient::new(&llm.mentor, llm)?;
        let companion_llm = LlmClient::new(&llm.companion, llm)?;
        let sessions = SessionStore::with_limit(settings.session().max_per_account);

        Ok(Self {
            inner: Arc::new(InnerState {
                settings,
                db,
                question_bank,
                redis,
                storage,
                sessions,
                mentor_llm,
                companion_llm,
            }),
        })
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn question_bank(&self) -> &dyn QuestionBank {
        self.inner.question_bank.as_ref()
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn storage(&self) -> Option<&StorageService> {
        self.inner.storage.as_ref()
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub(crate) fn mentor_llm(&self) -> &LlmClient {
        &self.inner.mentor_llm
    }

    pub(crate) fn companion_llm(&self) -> &LlmClient {
        &self.inner.companion_llm
    }
}
