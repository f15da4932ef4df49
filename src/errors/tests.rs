use super::*;
use anyhow::Context;

#[test]
fn not_found_display() {
    let err = SessionError::NotFound("abc".into());
    assert_eq!(err.to_string(), "Session not found: abc");
}

#[test]
fn config_error_display() {
    let err = SessionError::Config("unknown backend \"redis\"".into());
    assert_eq!(
        err.to_string(),
        "Configuration error: unknown backend \"redis\""
    );
}

#[test]
fn invalid_id_is_debug_quoted() {
    let err = SessionError::InvalidId("../etc".into());
    assert_eq!(err.to_string(), "Invalid session id: \"../etc\"");
}

#[test]
fn storage_error_keeps_context_chain() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: SessionError = Err::<(), _>(io)
        .context("Failed to read session file: storage/sessions/abc")
        .unwrap_err()
        .into();
    let msg = err.to_string();
    assert!(msg.starts_with("Storage error: Failed to read session file"));
    assert!(msg.contains("denied"));
}

#[test]
fn missing_expired_and_invalid_need_new_session() {
    assert!(SessionError::NotFound("a".into()).needs_new_session());
    assert!(SessionError::Expired("a".into()).needs_new_session());
    assert!(SessionError::InvalidId("a/b".into()).needs_new_session());
}

#[test]
fn faults_do_not_need_new_session() {
    assert!(!SessionError::Config("x".into()).needs_new_session());
    assert!(!SessionError::ReservedKey("expiresAt".into()).needs_new_session());
    assert!(!SessionError::Storage(anyhow::anyhow!("disk full")).needs_new_session());
}
