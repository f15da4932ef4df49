use thiserror::Error;

/// Typed error hierarchy for sessionvault.
///
/// Use at module boundaries (manager, stores, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Storage`
/// variant allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session expired: {0}")]
    Expired(String),

    #[error("Invalid session id: {0:?}")]
    InvalidId(String),

    #[error("Reserved key cannot be stored in session data: {0}")]
    ReservedKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Convenience alias for results using SessionError.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Whether the caller should start over with a fresh session.
    ///
    /// Missing, expired and malformed ids all collapse into the same
    /// "no usable session" outcome for request handlers.
    pub fn needs_new_session(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::Expired(_) | Self::InvalidId(_) => true,
            Self::ReservedKey(_) | Self::Config(_) | Self::Storage(_) => false,
        }
    }
}

#[cfg(test)]
mod tests;
