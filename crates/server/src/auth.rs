use std::collections::HashMap;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Clone)]
struct Session {
    user_id: u64,
    expires_at: DateTime<Utc>,
}

/// In-memory bearer-token sessions. Tokens do not survive a restart.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Start a session and return its token.
    pub fn create(&mut self, user_id: u64, now: DateTime<Utc>) -> String {
        self.prune(now);
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                expires_at: now
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        );
        token
    }

    /// The user behind `token`, if it exists and has not expired.
    pub fn resolve(&mut self, token: &str, now: DateTime<Utc>) -> Option<u64> {
        let (user_id, expires_at) = self
            .sessions
            .get(token)
            .map(|s| (s.user_id, s.expires_at))?;
        if expires_at <= now {
            self.sessions.remove(token);
            return None;
        }
        Some(user_id)
    }

    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every session of `user_id`, except `keep` when given.
    pub fn revoke_user(&mut self, user_id: u64, keep: Option<&str>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|token, s| s.user_id != user_id || Some(token.as_str()) == keep);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, s| s.expires_at > now);
    }
}

/// The signed-in user, taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: u64,
    pub token: String,
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Login required".to_string()))?;

        let id = state
            .sessions()?
            .resolve(token, Utc::now())
            .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

        Ok(CurrentUser {
            id,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn tokens_resolve_until_they_expire() {
        let mut store = SessionStore::new(Duration::hours(2));
        let token = store.create(7, now());

        assert_eq!(store.resolve(&token, now()), Some(7));
        assert_eq!(store.resolve(&token, now() + Duration::minutes(119)), Some(7));
        assert_eq!(store.resolve(&token, now() + Duration::hours(2)), None);
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let mut store = SessionStore::new(Duration::hours(1));
        store.create(1, now());
        assert_eq!(store.resolve("nope", now()), None);
    }

    #[test]
    fn each_login_gets_its_own_token() {
        let mut store = SessionStore::new(Duration::hours(1));
        let a = store.create(1, now());
        let b = store.create(1, now());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn revoke_user_can_keep_the_current_session() {
        let mut store = SessionStore::new(Duration::hours(1));
        let keep = store.create(1, now());
        let other = store.create(1, now());
        let stranger = store.create(2, now());

        assert_eq!(store.revoke_user(1, Some(&keep)), 1);
        assert_eq!(store.resolve(&keep, now()), Some(1));
        assert_eq!(store.resolve(&other, now()), None);
        assert_eq!(store.resolve(&stranger, now()), Some(2));

        assert_eq!(store.revoke_user(1, None), 1);
        assert_eq!(store.resolve(&keep, now()), None);
    }

    #[test]
    fn creating_a_session_prunes_expired_ones() {
        let mut store = SessionStore::new(Duration::hours(1));
        store.create(1, now());
        store.create(2, now() + Duration::hours(3));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut store = SessionStore::new(Duration::hours(1));
        let token = store.create(1, now());
        assert!(store.revoke(&token));
        assert!(!store.revoke(&token));
    }
}
