use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::Serialize;
use std::time::Duration;

use super::credentials::Credential;

/// An authenticated user's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Live sessions indexed by bearer token
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_age,
        }
    }

    /// Open a session for a verified credential
    pub fn open(&self, credential: &Credential) -> Session {
        let session = Session {
            token: generate_token(),
            username: credential.username.clone(),
            is_admin: credential.is_admin,
            created_at: Utc::now(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        tracing::info!(username = %session.username, "Session opened");
        session
    }

    /// Look up a live session; expired sessions are dropped
    pub fn get(&self, token: &str) -> Option<Session> {
        let session = self.sessions.get(token).map(|s| s.clone())?;
        if self.is_expired(&session, Utc::now()) {
            self.sessions.remove(token);
            return None;
        }
        Some(session)
    }

    /// Close a session; returns false when the token was unknown
    pub fn close(&self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some((_, session)) => {
                tracing::info!(username = %session.username, "Session closed");
                true
            }
            None => false,
        }
    }

    /// Remove every expired session, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !self.is_expired(s, now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(session.created_at);
        age.to_std().map(|age| age > self.max_age).unwrap_or(false)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::tests::credential;

    #[test]
    fn test_open_get_close() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let session = store.open(&credential("alice", "secret", true));

        assert_eq!(session.token.len(), 64);
        let found = store.get(&session.token).unwrap();
        assert_eq!(found.username, "alice");
        assert!(found.is_admin);

        assert!(store.close(&session.token));
        assert!(store.get(&session.token).is_none());
        assert!(!store.close(&session.token));
    }

    #[test]
    fn test_tokens_are_unique() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let cred = credential("alice", "secret", false);
        let a = store.open(&cred);
        let b = store.open(&cred);
        assert_ne!(a.token, b.token);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::ZERO);
        let session = store.open(&credential("alice", "secret", false));
        std::thread::sleep(Duration::from_millis(5));

        assert!(store.get(&session.token).is_none());
        store.open(&credential("bob", "secret", false));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.purge_expired(), 1);
        assert!(store.is_empty());
    }
}
