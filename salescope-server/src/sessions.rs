//! In-memory session registry for the Ask assistant.
//!
//! Each browsing session owns one `ConversationSession` behind a tokio
//! mutex; holding the mutex across a pipeline run is what guarantees at
//! most one in-flight question per session. Independent sessions share
//! nothing here and run fully in parallel.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use salescope_core::ConversationSession;
use tokio::sync::Mutex;

pub type SharedSession = Arc<Mutex<ConversationSession>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SharedSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session for `key`, creating an empty one on first use.
    pub fn get_or_create(&self, key: &str) -> SharedSession {
        {
            let sessions = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(session) = sessions.get(key) {
                return session.clone();
            }
        }

        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationSession::new())))
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<SharedSession> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Drop the session entirely (explicit clear / session end). A later
    /// ask on the same key starts a fresh log.
    pub fn remove(&self, key: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescope_core::models::Turn;

    #[tokio::test]
    async fn test_get_or_create_returns_the_same_session() {
        let store = SessionStore::new();

        let first = store.get_or_create("u-123");
        first.lock().await.append(Turn::user("hello"));

        let second = store.get_or_create("u-123");
        assert_eq!(second.lock().await.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_starts_fresh_on_next_use() {
        let store = SessionStore::new();
        store
            .get_or_create("u-123")
            .lock()
            .await
            .append(Turn::user("old"));

        assert!(store.remove("u-123"));
        assert!(!store.remove("u-123"));

        let fresh = store.get_or_create("u-123");
        assert!(fresh.lock().await.is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = SessionStore::new();
        store.get_or_create("alice");
        store.get_or_create("bob");
        assert_eq!(store.len(), 2);

        store.remove("alice");
        assert!(store.get("alice").is_none());
        assert!(store.get("bob").is_some());
    }
}
