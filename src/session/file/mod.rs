pub mod codec;

use crate::errors::{SessionError, SessionResult};
use crate::session::id::validate_session_id;
use crate::session::locks::{LockMode, StoreLocks};
use crate::session::store::{BackendKind, SessionStore};
use crate::session::types::expiry_from_now;
use crate::session::Session;
use crate::utils::{atomic_write, ensure_dir};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Durable store: one text file per session, named by its id.
///
/// Filesystem work runs on the blocking pool while the store lock is held.
/// There is no cross-process locking; two processes sharing a directory race
/// with last-writer-wins semantics.
pub struct FileStore {
    dir: PathBuf,
    ttl: TimeDelta,
    locks: StoreLocks,
}

impl FileStore {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>, ttl: TimeDelta, lock_mode: LockMode) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            locks: StoreLocks::new(lock_mode),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_mode(&self) -> LockMode {
        self.locks.mode()
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.tracked()
    }

    pub(crate) fn session_path(&self, id: &str) -> SessionResult<PathBuf> {
        validate_session_id(id)?;
        Ok(self.dir.join(id))
    }

    async fn write(&self, path: PathBuf, content: String) -> SessionResult<()> {
        let dir = self.dir.clone();
        blocking(move || write_record(&dir, &path, &content)).await
    }

    /// Delete `id` if its record has expired. Unreadable or corrupt records
    /// are logged and left in place. Caller holds the lock.
    ///
    /// Only a failed removal is an error; the sweep logs it, visits the
    /// remaining ids, then reports the first one.
    async fn sweep_one(&self, id: &str, now: DateTime<Utc>) -> SessionResult<bool> {
        let path = self.dir.join(id);

        let read_path = path.clone();
        let content = match blocking(move || read_record(&read_path)).await {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("sweep skipped session {}: {}", id, e);
                return Ok(false);
            }
        };
        let session = match codec::decode(id, &content) {
            Ok(session) => session,
            Err(e) => {
                warn!("sweep skipped corrupt session {}: {:#}", id, e);
                return Ok(false);
            }
        };

        if !session.is_expired_at(now) {
            return Ok(false);
        }
        blocking(move || remove_record(&path)).await?;
        debug!("Session {} expired, so deleted", id);
        Ok(true)
    }
}

/// Run filesystem work off the async executor.
async fn blocking<T, F>(f: F) -> SessionResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .context("Session file task failed")?;
    Ok(result?)
}

fn write_record(dir: &Path, path: &Path, content: &str) -> anyhow::Result<()> {
    ensure_session_dir(dir)?;
    atomic_write(path, content)
        .with_context(|| format!("Failed to write session file: {}", path.display()))
}

/// `None` when the file does not exist.
fn read_record(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to read session file: {}", path.display())),
    }
}

/// `false` when there was nothing to remove.
fn remove_record(path: &Path) -> anyhow::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to remove session file: {}", path.display())),
    }
}

/// Every regular file whose name is a valid id. Leftover temp files and
/// anything else that could not have been written by this store are skipped.
fn list_ids(dir: &Path) -> anyhow::Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to list session directory: {}", dir.display())
            });
        }
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to list session directory: {}", dir.display()))?;
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if validate_session_id(&name).is_ok() => ids.push(name),
            Ok(name) => debug!("skipping non-session file {} in {}", name, dir.display()),
            Err(name) => debug!("skipping non-UTF-8 file {:?} in {}", name, dir.display()),
        }
    }
    Ok(ids)
}

fn ensure_session_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    ensure_dir(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }
    debug!("created session directory {}", dir.display());
    Ok(())
}

#[async_trait]
impl SessionStore for FileStore {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn init_session(&self, id: &str) -> SessionResult<Session> {
        let path = self.session_path(id)?;
        let session = Session::new(id, expiry_from_now(self.ttl), HashMap::new());
        let content = codec::encode(&session)?;

        let result = {
            let _guard = self.locks.lock(id).await;
            self.write(path, content).await
        };
        self.locks.release(id);
        result?;
        debug!("Created session file: {}", id);
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> SessionResult<Session> {
        let path = self.session_path(id)?;

        let content = {
            let _guard = self.locks.lock(id).await;
            let read_path = path.clone();
            blocking(move || read_record(&read_path)).await
        };
        self.locks.release(id);

        let Some(content) = content? else {
            return Err(SessionError::NotFound(id.to_string()));
        };
        let session = codec::decode(id, &content)
            .with_context(|| format!("Corrupt session file: {}", path.display()))?;
        Ok(session)
    }

    async fn set_session(&self, session: &Session) -> SessionResult<()> {
        let path = self.session_path(session.id())?;
        let content = codec::encode(session)?;

        let result = {
            let _guard = self.locks.lock(session.id()).await;
            self.write(path, content).await
        };
        self.locks.release(session.id());
        result
    }

    async fn delete_session(&self, id: &str) -> SessionResult<()> {
        let path = self.session_path(id)?;

        let removed = {
            let _guard = self.locks.lock(id).await;
            blocking(move || remove_record(&path)).await
        };
        self.locks.release(id);

        if removed? {
            debug!("Deleted session file: {}", id);
        }
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> SessionResult<usize> {
        let sweep_guard = self.locks.lock_all().await;
        let dir = self.dir.clone();
        let ids = blocking(move || list_ids(&dir)).await?;
        let now = Utc::now();
        let mut removed = 0;
        let mut first_error = None;

        for id in ids {
            let id_guard = if sweep_guard.is_some() {
                None
            } else {
                Some(self.locks.lock(&id).await)
            };
            let result = self.sweep_one(&id, now).await;
            drop(id_guard);
            self.locks.release(&id);

            match result {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("sweep failed to remove session {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if removed > 0 {
            info!("Swept {} expired sessions from {}", removed, self.dir.display());
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    async fn session_ids(&self) -> SessionResult<Vec<String>> {
        let _guard = self.locks.lock_all().await;
        let dir = self.dir.clone();
        blocking(move || list_ids(&dir)).await
    }
}
