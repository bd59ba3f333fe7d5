//! Shared API types: request context, session identity, token helpers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use clinic_core::{DbPool, User};

use crate::api::error::ApiError;
use crate::api::session::SessionStore;

/// Shared state for every handler and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub pool: DbPool,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl ApiContext {
    pub fn new(pool: DbPool, session_ttl: Duration) -> Self {
        Self {
            pool,
            sessions: Arc::new(Mutex::new(SessionStore::new(session_ttl))),
        }
    }

    /// Lock the session store. Never hold the guard across an `.await`.
    pub fn sessions(&self) -> Result<MutexGuard<'_, SessionStore>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::internal("access sessions", "session lock poisoned"))
    }
}

/// The signed-in user, injected by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

/// SHA-256 of a session token. Only the hash is kept server-side.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random session token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
