//! Cookie sessions held in memory.
//!
//! The client holds an opaque random token in the `clinic_sid` cookie; the
//! store is keyed by its SHA-256. Expired sessions are dropped when they are
//! next looked up or when a new session is created.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};

use crate::api::types::{generate_token, hash_token, SessionUser};

pub const SESSION_COOKIE: &str = "clinic_sid";

struct SessionEntry {
    user: SessionUser,
    expires: Instant,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: HashMap<[u8; 32], SessionEntry>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `user`, returning the raw token for the cookie.
    pub fn create(&mut self, user: SessionUser) -> String {
        self.prune();
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                user,
                expires: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Look up the user for a token, forgetting it if it has expired.
    pub fn validate(&mut self, token: &str) -> Option<SessionUser> {
        let key = hash_token(token);
        match self.sessions.get(&key) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.user.clone()),
            Some(_) => {
                self.sessions.remove(&key);
                None
            }
            None => None,
        }
    }

    /// End a session. Returns false if it did not exist.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn prune(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| entry.expires > now);
    }
}

/// `Set-Cookie` value carrying a new session token.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Session token from the request's `Cookie` headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn admin() -> SessionUser {
        SessionUser {
            id: "u-1".into(),
            username: "admin".into(),
        }
    }

    #[test]
    fn created_session_validates() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(admin());
        assert_eq!(store.validate(&token), Some(admin()));
        assert_eq!(store.validate("not-a-token"), None);
    }

    #[test]
    fn expired_session_is_dropped() {
        let mut store = SessionStore::new(Duration::ZERO);
        let token = store.create(admin());
        assert_eq!(store.validate(&token), None);
        assert!(store.is_empty());
    }

    #[test]
    fn revoke_ends_session() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(admin());
        assert!(store.revoke(&token));
        assert!(!store.revoke(&token));
        assert_eq!(store.validate(&token), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", Duration::from_secs(86400));
        assert_eq!(
            cookie,
            "clinic_sid=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
        );
        assert!(clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn token_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; clinic_sid=tok123; other=1"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("tok123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("clinic_sid_old=x"));
        assert_eq!(token_from_headers(&headers), None);
    }
}
