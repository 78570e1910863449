use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::services::companion::COMPANION_PROMPT;
use crate::services::conversation::Conversation;
use crate::services::exam_session::ExamSession;
use crate::services::mentor::MENTOR_PROMPT;
use crate::services::speech::SpeechHandle;

/// Everything one study session carries between requests.
#[derive(Debug)]
pub(crate) struct SessionContext {
    pub(crate) id: Uuid,
    pub(crate) exam: ExamSession,
    pub(crate) mentor: Conversation,
    pub(crate) companion: Conversation,
    pub(crate) document_summary: Option<String>,
    /// Student id of the latest registration made in this session.
    pub(crate) student_id: Option<String>,
    pub(crate) speech: SpeechHandle,
}

impl SessionContext {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            exam: ExamSession::new(),
            mentor: Conversation::new(MENTOR_PROMPT),
            companion: Conversation::new(COMPANION_PROMPT),
            document_summary: None,
            student_id: None,
            speech: SpeechHandle::default(),
        }
    }

    /// Companion turns are persisted under the session id.
    pub(crate) fn conversation_id(&self) -> Uuid {
        self.id
    }
}

pub(crate) type SharedContext = Arc<Mutex<SessionContext>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SessionError {
    #[error("Session not found")]
    NotFound,
    #[error("Session belongs to another account")]
    Forbidden,
    #[error("Too many open sessions for this account")]
    LimitReached,
}

const DEFAULT_MAX_SESSIONS_PER_OWNER: usize = 20;

#[derive(Debug)]
struct SessionEntry {
    owner: String,
    context: SharedContext,
    last_seen_ms: AtomicU64,
}

#[derive(Debug)]
struct StoreInner {
    epoch: Instant,
    max_per_owner: usize,
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionStore {
    inner: Arc<StoreInner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_SESSIONS_PER_OWNER)
    }

    /// Caps how many live sessions one owner may hold at a time.
    pub(crate) fn with_limit(max_per_owner: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                epoch: Instant::now(),
                max_per_owner,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    fn now_ms(&self) -> u64 {
        self.inner.epoch.elapsed().as_millis() as u64
    }

    pub(crate) async fn create(&self, owner: &str) -> Result<(Uuid, SharedContext), SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        let owned = sessions.values().filter(|entry| entry.owner == owner).count();
        if owned >= self.inner.max_per_owner {
            return Err(SessionError::LimitReached);
        }

        let id = Uuid::new_v4();
        let context = Arc::new(Mutex::new(SessionContext::new(id)));
        let entry = SessionEntry {
            owner: owner.to_string(),
            context: context.clone(),
            last_seen_ms: AtomicU64::new(self.now_ms()),
        };

        sessions.insert(id, Arc::new(entry));
        tracing::debug!(session_id = %id, owner, "Session created");
        Ok((id, context))
    }

    /// Looks up a session owned by `owner` and marks it as active.
    pub(crate) async fn get(&self, id: Uuid, owner: &str) -> Result<SharedContext, SessionError> {
        let sessions = self.inner.sessions.read().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound)?;
        if entry.owner != owner {
            return Err(SessionError::Forbidden);
        }

        entry.last_seen_ms.store(self.now_ms(), Ordering::Relaxed);
        Ok(entry.context.clone())
    }

    pub(crate) async fn remove(&self, id: Uuid, owner: &str) -> Result<(), SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        match sessions.get(&id) {
            None => Err(SessionError::NotFound),
            Some(entry) if entry.owner != owner => Err(SessionError::Forbidden),
            Some(_) => {
                sessions.remove(&id);
                Ok(())
            }
        }
    }

    /// Drops every session of `owner`; returns how many were removed.
    pub(crate) async fn remove_all_for(&self, owner: &str) -> usize {
        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.owner != owner);
        before - sessions.len()
    }

    /// Drops sessions not touched for longer than `max_idle`.
    pub(crate) async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_ms();
        let max_idle_ms = max_idle.as_millis() as u64;

        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            now.saturating_sub(entry.last_seen_ms.load(Ordering::Relaxed)) <= max_idle_ms
        });
        before - sessions.len()
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::exam_session::ExamState;

    #[tokio::test]
    async fn sessions_are_scoped_to_their_owner() {
        let store = SessionStore::new();
        let (id, _) = store.create("alice").await.expect("create");

        assert!(store.get(id, "alice").await.is_ok());
        assert_eq!(store.get(id, "bob").await.err(), Some(SessionError::Forbidden));
        assert_eq!(store.get(Uuid::new_v4(), "alice").await.err(), Some(SessionError::NotFound));
        assert_eq!(store.remove(id, "bob").await, Err(SessionError::Forbidden));
        assert_eq!(store.remove(id, "alice").await, Ok(()));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn new_context_starts_clean() {
        let store = SessionStore::new();
        let (id, context) = store.create("alice").await.expect("create");
        let context = context.lock().await;

        assert_eq!(context.conversation_id(), id);
        assert_eq!(context.exam.state(), ExamState::NotStarted);
        assert!(context.mentor.turns().is_empty());
        assert!(context.document_summary.is_none());
        assert!(!context.speech.is_speaking());
    }

    #[tokio::test]
    async fn state_persists_between_lookups() {
        let store = SessionStore::new();
        let (id, context) = store.create("alice").await.expect("create");
        context.lock().await.document_summary = Some("summary".to_string());

        let again = store.get(id, "alice").await.expect("session");
        assert_eq!(again.lock().await.document_summary.as_deref(), Some("summary"));
    }

    #[tokio::test]
    async fn remove_all_for_only_touches_owner() {
        let store = SessionStore::new();
        store.create("alice").await.expect("create");
        store.create("alice").await.expect("create");
        let (bob_session, _) = store.create("bob").await.expect("create");

        assert_eq!(store.remove_all_for("alice").await, 2);
        assert_eq!(store.len().await, 1);
        assert!(store.get(bob_session, "bob").await.is_ok());
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_sessions() {
        let store = SessionStore::new();
        store.create("alice").await.expect("create");

        assert_eq!(store.sweep_idle(Duration::from_secs(3600)).await, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.sweep_idle(Duration::from_millis(5)).await, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn owner_session_count_is_capped() {
        let store = SessionStore::with_limit(2);
        let (first, _) = store.create("alice").await.expect("first");
        store.create("alice").await.expect("second");

        assert_eq!(store.create("alice").await.err(), Some(SessionError::LimitReached));
        assert!(store.create("bob").await.is_ok());
        assert_eq!(store.len().await, 3);

        store.remove(first, "alice").await.expect("remove");
        assert!(store.create("alice").await.is_ok());
    }
}
