//! In-memory keyed registry of debate sessions.
//!
//! The store is an explicit value, not ambient global state: a hosting process creates one
//! and shares it behind an `Arc`. Sessions are advanced under a checkout/checkin
//! discipline that enforces single-writer-per-key: a session that is checked out for an
//! orchestrator run cannot be checked out again until it is returned. While a session is
//! checked out, readers still see the last checked-in snapshot.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::session::{ConfigError, DebateConfig, DebateSession};

/// Failures surfaced by store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No session registered under this id.
    NotFound(Uuid),
    /// The session is currently checked out by another run.
    CheckedOut(Uuid),
    /// The supplied config failed validation; no session was created.
    InvalidConfig(ConfigError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "no session found for id {}", id),
            StoreError::CheckedOut(id) => {
                write!(f, "session {} is checked out by another run", id)
            }
            StoreError::InvalidConfig(err) => write!(f, "{}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<Uuid, DebateSession>,
    checked_out: HashSet<Uuid>,
}

/// Keyed in-memory store of [`DebateSession`]s.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Validate `config`, mint a new session, and register it. Returns the new id.
    ///
    /// Ids are unique even when many sessions are created with identical configs.
    pub async fn create(&self, config: DebateConfig) -> Result<Uuid, StoreError> {
        let session = DebateSession::new(config).map_err(StoreError::InvalidConfig)?;
        let id = session.id;
        self.inner.lock().await.sessions.insert(id, session);
        Ok(id)
    }

    /// Register an externally minted session.
    pub async fn insert(&self, session: DebateSession) {
        self.inner.lock().await.sessions.insert(session.id, session);
    }

    /// Snapshot of the session under `id`, if any. Reflects the last checkin.
    pub async fn get(&self, id: Uuid) -> Option<DebateSession> {
        self.inner.lock().await.sessions.get(&id).cloned()
    }

    /// Ids of all registered sessions.
    pub async fn list_ids(&self) -> Vec<Uuid> {
        self.inner.lock().await.sessions.keys().copied().collect()
    }

    /// Take exclusive write ownership of a session for one orchestrator run.
    pub async fn checkout(&self, id: Uuid) -> Result<DebateSession, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.checked_out.contains(&id) {
            return Err(StoreError::CheckedOut(id));
        }
        let session = inner
            .sessions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        inner.checked_out.insert(id);
        Ok(session)
    }

    /// Return a previously checked-out session, publishing its new state to readers.
    pub async fn checkin(&self, session: DebateSession) {
        let mut inner = self.inner.lock().await;
        inner.checked_out.remove(&session.id);
        inner.sessions.insert(session.id, session);
    }

    /// Drop a session. Refused (returns None) while it is checked out.
    pub async fn remove(&self, id: Uuid) -> Option<DebateSession> {
        let mut inner = self.inner.lock().await;
        if inner.checked_out.contains(&id) {
            return None;
        }
        inner.sessions.remove(&id)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DebateStatus;

    fn valid_config() -> DebateConfig {
        DebateConfig::new(
            "What is the best programming language?",
            vec!["deepseek".to_string(), "gpt-5".to_string()],
        )
    }

    #[tokio::test]
    async fn create_registers_distinct_ids_for_identical_configs() {
        let store = SessionStore::new();
        let a = store.create(valid_config()).await.unwrap();
        let b = store.create(valid_config()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list_ids().await.len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_invalid_configs() {
        let store = SessionStore::new();
        let err = store
            .create(DebateConfig::new("  ", vec!["gpt-5".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
        assert!(store.list_ids().await.is_empty());
    }

    #[tokio::test]
    async fn double_checkout_is_refused_until_checkin() {
        let store = SessionStore::new();
        let id = store.create(valid_config()).await.unwrap();

        let mut session = store.checkout(id).await.unwrap();
        assert!(matches!(
            store.checkout(id).await,
            Err(StoreError::CheckedOut(_))
        ));

        session.status = DebateStatus::InProgress;
        store.checkin(session).await;

        let again = store.checkout(id).await.unwrap();
        assert_eq!(again.status, DebateStatus::InProgress);
    }

    #[tokio::test]
    async fn readers_see_last_checked_in_snapshot_during_checkout() {
        let store = SessionStore::new();
        let id = store.create(valid_config()).await.unwrap();

        let _held = store.checkout(id).await.unwrap();
        let snapshot = store.get(id).await.unwrap();
        assert_eq!(snapshot.status, DebateStatus::Pending);
    }

    #[tokio::test]
    async fn remove_is_refused_while_checked_out() {
        let store = SessionStore::new();
        let id = store.create(valid_config()).await.unwrap();

        let held = store.checkout(id).await.unwrap();
        assert!(store.remove(id).await.is_none());

        store.checkin(held).await;
        assert!(store.remove(id).await.is_some());
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn checkout_of_unknown_id_is_not_found() {
        let store = SessionStore::new();
        assert!(matches!(
            store.checkout(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
