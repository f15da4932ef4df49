//! Lock discipline for stores that touch shared resources.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// How a store serializes access to its records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockMode {
    /// One lock for the whole store; every operation serializes against every other.
    #[default]
    Global,
    /// One lock per session id; different ids proceed concurrently.
    PerSession,
}

/// Per-key async mutex map.
///
/// Operations on the same key serialize, different keys run concurrently.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// Get or create the lock for `key`.
    pub(crate) fn get(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the entry for `key` if nobody else holds or waits on it.
    pub(crate) fn release(&self, key: &str) {
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

pub(crate) enum StoreLocks {
    Global(Arc<Mutex<()>>),
    PerSession(KeyedLocks),
}

impl StoreLocks {
    pub(crate) fn new(mode: LockMode) -> Self {
        match mode {
            LockMode::Global => Self::Global(Arc::new(Mutex::new(()))),
            LockMode::PerSession => Self::PerSession(KeyedLocks::default()),
        }
    }

    pub(crate) fn mode(&self) -> LockMode {
        match self {
            Self::Global(_) => LockMode::Global,
            Self::PerSession(_) => LockMode::PerSession,
        }
    }

    /// Serialize against other operations on `id` (or on anything, in global mode).
    pub(crate) async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        match self {
            Self::Global(lock) => lock.clone().lock_owned().await,
            Self::PerSession(locks) => locks.get(id).lock_owned().await,
        }
    }

    /// Take the store-wide lock for a bulk pass. `None` in per-session mode,
    /// where the caller locks each id as it goes.
    pub(crate) async fn lock_all(&self) -> Option<OwnedMutexGuard<()>> {
        match self {
            Self::Global(lock) => Some(lock.clone().lock_owned().await),
            Self::PerSession(_) => None,
        }
    }

    /// Per-id locks currently held in the map. Always 0 in global mode.
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        match self {
            Self::Global(_) => 0,
            Self::PerSession(locks) => locks.len(),
        }
    }

    /// Forget the per-id lock once nobody holds or waits on it. Call with the
    /// guard dropped.
    pub(crate) fn release(&self, id: &str) {
        if let Self::PerSession(locks) = self {
            locks.release(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_same_lock_for_same_key() {
        let locks = KeyedLocks::default();
        assert!(Arc::ptr_eq(&locks.get("key1"), &locks.get("key1")));
    }

    #[test]
    fn get_returns_different_locks_for_different_keys() {
        let locks = KeyedLocks::default();
        assert!(!Arc::ptr_eq(&locks.get("key1"), &locks.get("key2")));
    }

    #[test]
    fn release_keeps_locks_with_active_references() {
        let locks = KeyedLocks::default();
        let held = locks.get("held");
        locks.get("idle");

        locks.release("held");
        locks.release("idle");

        assert_eq!(locks.len(), 1);
        drop(held);
        locks.release("held");
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn global_mode_serializes_different_ids() {
        let locks = StoreLocks::new(LockMode::Global);
        let _guard = locks.lock("a").await;

        let StoreLocks::Global(inner) = &locks else {
            panic!("expected global locks");
        };
        assert!(inner.try_lock().is_err());
    }

    #[tokio::test]
    async fn per_session_mode_allows_different_ids() {
        let locks = StoreLocks::new(LockMode::PerSession);
        let _a = locks.lock("a").await;

        let StoreLocks::PerSession(keyed) = &locks else {
            panic!("expected per-session locks");
        };
        assert!(keyed.get("b").try_lock().is_ok());
        assert!(keyed.get("a").try_lock().is_err());
    }

    #[tokio::test]
    async fn release_after_use_leaves_no_entries() {
        let locks = StoreLocks::new(LockMode::PerSession);
        for i in 0..10 {
            let id = format!("s{}", i);
            drop(locks.lock(&id).await);
            locks.release(&id);
        }
        assert_eq!(locks.tracked(), 0);
        assert_eq!(StoreLocks::new(LockMode::Global).tracked(), 0);
    }

    #[tokio::test]
    async fn lock_all_only_in_global_mode() {
        assert!(StoreLocks::new(LockMode::Global).lock_all().await.is_some());
        assert!(StoreLocks::new(LockMode::PerSession).lock_all().await.is_none());
    }

    #[test]
    fn lock_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&LockMode::PerSession).unwrap(),
            "\"perSession\""
        );
        let mode: LockMode = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(mode, LockMode::Global);
    }
}
