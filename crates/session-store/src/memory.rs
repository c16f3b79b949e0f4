use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{Result, SessionKey, SessionStore, StateBag};

#[derive(Debug, Clone)]
struct StoredSession {
    state: StateBag,
    touched_at: Instant,
}

/// In-memory session store.
///
/// Used by tests and by single-process deployments without a database.
/// With a TTL configured, sessions idle for longer than the TTL read as empty
/// and are dropped by [`InMemorySessionStore::purge_expired`].
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionKey, StoredSession>>>,
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    /// Creates a store whose sessions never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that forgets sessions idle for longer than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl: Some(ttl),
        }
    }

    /// Returns the number of stored sessions, expired ones included.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Removes every session idle for longer than the TTL.
    ///
    /// Returns how many sessions were removed.
    pub async fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.touched_at.elapsed() <= ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "purged expired sessions");
        }
        removed
    }

    fn is_live(&self, session: &StoredSession) -> bool {
        self.ttl
            .is_none_or(|ttl| session.touched_at.elapsed() <= ttl)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> Result<StateBag> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(key)
            .filter(|s| self.is_live(s))
            .map(|s| s.state.clone())
            .unwrap_or_default())
    }

    async fn merge(&self, key: &SessionKey, partial: StateBag) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let live = sessions.get(key).is_some_and(|s| self.is_live(s));
        let session = sessions.entry(key.clone()).or_insert_with(|| StoredSession {
            state: StateBag::new(),
            touched_at: Instant::now(),
        });
        if !live {
            session.state.clear();
        }
        session.state.extend(partial);
        session.touched_at = Instant::now();
        Ok(())
    }

    async fn replace(&self, key: &SessionKey, full: StateBag) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            key.clone(),
            StoredSession {
                state: full,
                touched_at: Instant::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionStoreExt;
    use common::UserId;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> StateBag {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn get_absent_session_is_empty() {
        let store = InMemorySessionStore::new();
        let state = store.get(&SessionKey::chat(UserId::new(1))).await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn merge_overwrites_only_given_keys() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::chat(UserId::new(1));

        store
            .merge(&key, bag(json!({"cart": {"a": 1}, "page": 0})))
            .await
            .unwrap();
        store.merge(&key, bag(json!({"page": 3}))).await.unwrap();

        let state = store.get(&key).await.unwrap();
        assert_eq!(state["cart"], json!({"a": 1}));
        assert_eq!(state["page"], json!(3));
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn merge_is_shallow() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::chat(UserId::new(1));

        store
            .merge(&key, bag(json!({"cart": {"a": 1, "b": 2}})))
            .await
            .unwrap();
        store
            .merge(&key, bag(json!({"cart": {"c": 3}})))
            .await
            .unwrap();

        let state = store.get(&key).await.unwrap();
        assert_eq!(state["cart"], json!({"c": 3}));
    }

    #[tokio::test]
    async fn replace_drops_unlisted_keys() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::chat(UserId::new(1));

        store
            .merge(&key, bag(json!({"cart": {}, "page": 1})))
            .await
            .unwrap();
        store.replace(&key, bag(json!({"page": 2}))).await.unwrap();

        let state = store.get(&key).await.unwrap();
        assert_eq!(state, bag(json!({"page": 2})));
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let store = InMemorySessionStore::new();
        let alice = SessionKey::chat(UserId::new(1));
        let bob = SessionKey::chat(UserId::new(2));

        store.merge(&alice, bag(json!({"page": 5}))).await.unwrap();

        assert!(store.get(&bob).await.unwrap().is_empty());
        assert_eq!(store.get(&alice).await.unwrap()["page"], json!(5));
    }

    #[tokio::test]
    async fn concurrent_writers_for_different_users_do_not_interfere() {
        let store = InMemorySessionStore::new();
        let mut handles = Vec::new();
        for id in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = SessionKey::chat(UserId::new(id));
                store
                    .merge(&key, bag(json!({ "owner": id })))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for id in 0..32 {
            let state = store.get(&SessionKey::chat(UserId::new(id))).await.unwrap();
            assert_eq!(state["owner"], json!(id));
        }
    }

    #[tokio::test]
    async fn typed_field_helpers_roundtrip() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::chat(UserId::new(1));

        let missing: Vec<u32> = store.load_field(&key, "pages").await.unwrap();
        assert!(missing.is_empty());

        store.store_field(&key, "pages", &vec![1u32, 2, 3]).await.unwrap();
        store.store_field(&key, "other", "kept").await.unwrap();

        let pages: Vec<u32> = store.load_field(&key, "pages").await.unwrap();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(store.get(&key).await.unwrap()["other"], json!("kept"));
    }

    #[tokio::test]
    async fn load_field_reports_type_mismatch() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::chat(UserId::new(1));
        store.merge(&key, bag(json!({"pages": "oops"}))).await.unwrap();

        let result: Result<Vec<u32>> = store.load_field(&key, "pages").await;
        assert!(matches!(
            result,
            Err(crate::SessionStoreError::Serialization(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_sessions_read_as_empty_and_are_purged() {
        let store = InMemorySessionStore::with_ttl(Duration::from_secs(60));
        let key = SessionKey::chat(UserId::new(1));
        store.merge(&key, bag(json!({"page": 1}))).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(store.get(&key).await.unwrap().is_empty());
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn merge_into_expired_session_starts_fresh() {
        let store = InMemorySessionStore::with_ttl(Duration::from_secs(60));
        let key = SessionKey::chat(UserId::new(1));
        store
            .merge(&key, bag(json!({"cart": {"a": 1}})))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        store.merge(&key, bag(json!({"page": 0}))).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), bag(json!({"page": 0})));
    }
}
