use crate::config::SessionConfig;
use crate::errors::{SessionError, SessionResult};
use crate::session::file::FileStore;
use crate::session::id::{generate_session_id, validate_session_id};
use crate::session::locks::LockMode;
use crate::session::memory::MemoryStore;
use crate::session::store::{BackendKind, SessionStore};
use crate::session::Session;
use chrono::{TimeDelta, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Longest accepted session lifetime. Anything longer is almost certainly a
/// typo, and expiry timestamps stay within four-digit years.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Owns the one storage backend of the process.
///
/// Built once at startup and shared by `Arc`. Unlike the stores it wraps,
/// the manager refuses to hand out expired sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> SessionResult<Self> {
        Self::from_backend_name(
            &config.backend,
            config.ttl()?,
            config.storage_path(),
            config.lock_mode,
        )
    }

    /// Build the backend named `name`. `storage_dir` and `lock_mode` only
    /// matter for the file backend. `ttl` must be in `(0, MAX_SESSION_TTL]`.
    pub fn from_backend_name(
        name: &str,
        ttl: Duration,
        storage_dir: impl Into<PathBuf>,
        lock_mode: LockMode,
    ) -> SessionResult<Self> {
        let kind: BackendKind = name.parse()?;
        if ttl.is_zero() || ttl > MAX_SESSION_TTL {
            return Err(SessionError::Config(format!(
                "Session ttl {:?} must be greater than zero and at most one year",
                ttl
            )));
        }
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|_| SessionError::Config(format!("Invalid session ttl: {:?}", ttl)))?;

        let store: Arc<dyn SessionStore> = match kind {
            BackendKind::Memory => Arc::new(MemoryStore::new(ttl)),
            BackendKind::File => {
                let dir = storage_dir.into();
                info!(
                    "Session files in {} ({:?} locking)",
                    dir.display(),
                    lock_mode
                );
                Arc::new(FileStore::new(dir, ttl, lock_mode))
            }
        };
        info!("Session backend: {}", kind);
        Ok(Self::with_store(store))
    }

    pub fn with_store(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    /// Start a session under a freshly generated id.
    pub async fn create_session(&self) -> SessionResult<Session> {
        let id = generate_session_id();
        let session = self.store.init_session(&id).await?;
        debug!("New session {} expires at {}", id, session.expires_at());
        Ok(session)
    }

    /// Load a session that is still usable.
    ///
    /// Malformed ids, missing records and expired records all fail with an
    /// error for which `needs_new_session()` is true. Expired records are
    /// left for the sweep.
    pub async fn get_session(&self, id: &str) -> SessionResult<Session> {
        let session = self.peek_session(id).await?;
        if session.is_expired_at(Utc::now()) {
            debug!("Refusing expired session {}", id);
            return Err(SessionError::Expired(id.to_string()));
        }
        Ok(session)
    }

    /// Load the stored record whether or not it has expired.
    pub async fn peek_session(&self, id: &str) -> SessionResult<Session> {
        validate_session_id(id)?;
        self.store.get_session(id).await
    }

    pub async fn set_session(&self, session: &Session) -> SessionResult<()> {
        validate_session_id(session.id())?;
        self.store.set_session(session).await
    }

    pub async fn delete_session(&self, id: &str) -> SessionResult<()> {
        validate_session_id(id)?;
        self.store.delete_session(id).await
    }

    pub async fn delete_expired_sessions(&self) -> SessionResult<usize> {
        self.store.delete_expired_sessions().await
    }

    pub async fn session_ids(&self) -> SessionResult<Vec<String>> {
        self.store.session_ids().await
    }
}
