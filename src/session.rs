use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::pipeline::FilterParams;

/// Per-operator state
///
/// Each browser session owns its own filter parameters; nothing about the
/// current filters is shared between operators.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub authenticated: bool,
    pub expires_at: SystemTime,
    pub params: FilterParams,
}

impl SessionContext {
    pub fn is_valid(&self, now: SystemTime) -> bool {
        self.authenticated && self.expires_at > now
    }
}

/// All live sessions, owned by the application state.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionContext>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    /// Create a new authenticated session
    ///
    /// Expired sessions are purged on the way.
    ///
    /// # Returns
    /// * `String` - A unique session ID
    pub async fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = SystemTime::now();
        let session = SessionContext {
            authenticated: true,
            expires_at: now.checked_add(self.lifetime).unwrap_or(now),
            params: FilterParams::default(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session_id.clone(), session);

        session_id
    }

    /// Look up a session that is authenticated and not expired.
    pub async fn get(&self, session_id: &str) -> Option<SessionContext> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|s| s.is_valid(SystemTime::now()))
            .cloned()
    }

    pub async fn params(&self, session_id: &str) -> Option<FilterParams> {
        self.get(session_id).await.map(|s| s.params)
    }

    /// Replace the filter parameters of a live session.
    ///
    /// Returns `false` when the session is unknown or expired.
    pub async fn set_params(&self, session_id: &str, params: FilterParams) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) if session.is_valid(SystemTime::now()) => {
                session.params = params;
                true
            }
            _ => false,
        }
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    #[tokio::test]
    async fn sessions_keep_their_own_params() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.create().await;
        let b = store.create().await;

        let params = FilterParams {
            primary_column: Some("village_marathi".into()),
            primary_values: [CellValue::text("Kothali")].into_iter().collect(),
            ..Default::default()
        };
        assert!(store.set_params(&a, params.clone()).await);

        assert_eq!(store.params(&a).await, Some(params));
        assert_eq!(store.params(&b).await, Some(FilterParams::default()));
    }

    #[tokio::test]
    async fn expired_and_removed_sessions_are_rejected() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.create().await;
        assert!(store.get(&id).await.is_none());
        assert!(!store.set_params(&id, FilterParams::default()).await);

        let live = SessionStore::new(Duration::from_secs(60));
        let id = live.create().await;
        assert!(live.get(&id).await.is_some());
        live.remove(&id).await;
        assert!(live.get(&id).await.is_none());
        assert_eq!(live.len().await, 0);
    }
}
