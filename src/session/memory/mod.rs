use crate::errors::{SessionError, SessionResult};
use crate::session::store::{BackendKind, SessionStore};
use crate::session::types::expiry_from_now;
use crate::session::Session;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Volatile store: one map guarded by one lock for every operation.
///
/// Values keep their exact dynamic type, including `Value::Opaque`.
/// Everything is lost when the process exits.
pub struct MemoryStore {
    ttl: TimeDelta,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn init_session(&self, id: &str) -> SessionResult<Session> {
        let mut sessions = self.sessions.lock().await;
        let session = Session::new(id, expiry_from_now(self.ttl), HashMap::new());
        sessions.insert(id.to_string(), session.clone());
        debug!("Created session: {}", id);
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> SessionResult<Session> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn set_session(&self, session: &Session) -> SessionResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id().to_string(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> SessionResult<()> {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(id).is_some() {
            debug!("Deleted session: {}", id);
        }
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> SessionResult<usize> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let expired = session.is_expired_at(now);
            if expired {
                debug!("Session {} expired, so deleted", id);
            }
            !expired
        });
        Ok(before - sessions.len())
    }

    async fn session_ids(&self) -> SessionResult<Vec<String>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.keys().cloned().collect())
    }
}
