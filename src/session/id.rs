use crate::errors::{SessionError, SessionResult};
use uuid::Uuid;

const MAX_SESSION_ID_LEN: usize = 128;

/// Fresh session id: 32 lowercase hex chars backed by a v4 UUID
/// (122 bits from the OS random source).
pub fn generate_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Accept only ids that are safe to use as a bare file name and cookie value.
pub fn validate_session_id(id: &str) -> SessionResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidId(id.to_string()))
    }
}
