// Shared test helpers; not every test binary uses every item.
#![allow(unused)]

use chrono::{Duration, Utc};
use sessionvault::session::{LockMode, Session, SessionManager};
use std::time::Duration as StdDuration;
use tempfile::TempDir;

pub const TTL: StdDuration = StdDuration::from_secs(3600);

pub fn memory_manager() -> SessionManager {
    SessionManager::from_backend_name("memory", TTL, "unused", LockMode::Global)
        .expect("memory manager")
}

/// File-backed manager in an isolated temp directory. Keep the `TempDir`
/// alive for as long as the manager is used.
pub fn file_manager(lock_mode: LockMode) -> (SessionManager, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let mgr = file_manager_in(&tmp, lock_mode);
    (mgr, tmp)
}

pub fn file_manager_in(tmp: &TempDir, lock_mode: LockMode) -> SessionManager {
    SessionManager::from_backend_name("file", TTL, tmp.path().join("sessions"), lock_mode)
        .expect("file manager")
}

/// Every backend configuration worth running a scenario against.
pub fn all_managers() -> Vec<(&'static str, SessionManager, Option<TempDir>)> {
    let (global, global_dir) = file_manager(LockMode::Global);
    let (per_session, per_session_dir) = file_manager(LockMode::PerSession);
    vec![
        ("memory", memory_manager(), None),
        ("file/global", global, Some(global_dir)),
        ("file/per-session", per_session, Some(per_session_dir)),
    ]
}

/// Copy of `session` that expired an hour ago.
pub fn make_expired(session: &Session) -> Session {
    Session::new(
        session.id(),
        Utc::now() - Duration::hours(1),
        session.data().clone(),
    )
}
