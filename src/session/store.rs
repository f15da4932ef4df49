use crate::errors::{SessionError, SessionResult};
use crate::session::Session;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// Trait for session storage backends
/// This allows pluggable storage implementations (memory, file-based, ...)
///
/// Stores are dumb: `get_session` returns expired records as-is and leaves
/// expiry policy to the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Which backend variant this is
    fn kind(&self) -> BackendKind;

    /// Allocate a record for a fresh id with an empty bag, expiring one TTL from now
    async fn init_session(&self, id: &str) -> SessionResult<Session>;

    /// Load a session, or `SessionError::NotFound`
    async fn get_session(&self, id: &str) -> SessionResult<Session>;

    /// Replace the stored record wholesale
    async fn set_session(&self, session: &Session) -> SessionResult<()>;

    /// Remove a record; removing a missing id is not an error
    async fn delete_session(&self, id: &str) -> SessionResult<()>;

    /// Delete every expired record and return how many were removed
    async fn delete_expired_sessions(&self) -> SessionResult<usize>;

    /// Ids of all stored records, expired or not
    async fn session_ids(&self) -> SessionResult<Vec<String>>;
}

/// Backend selected by name at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(SessionError::Config(format!(
                "unknown session backend {:?} (expected \"memory\" or \"file\")",
                other
            ))),
        }
    }
}
