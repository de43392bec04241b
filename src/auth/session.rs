//! Opaque session tokens backed by an expiring in-memory table.
//!
//! Tokens carry no embedded claims; all authorization data is re-derived from
//! the backing user record at validation time, so deactivating a user takes
//! effect on the next lookup without touching outstanding tokens. Expiry is
//! lazy: lookups are the only access path, so no background sweep is needed.

use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::clock::Clock;

const TOKEN_LEN: usize = 32;

/// Stored session state, keyed by its token.
#[derive(Clone, Copy, Debug)]
pub struct Session {
    pub user_id: Uuid,
    pub expires_at_ms: u64,
}

/// Token handed back to the client on login.
#[derive(Clone, Debug)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at_ms: u64,
}

pub struct SessionManager {
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ttl_ms: u64) -> Self {
        Self {
            clock,
            ttl_ms,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails.
    pub fn create(&self, user_id: Uuid) -> Result<IssuedSession> {
        let token = generate_token()?;
        let expires_at_ms = self.clock.now_ms().saturating_add(self.ttl_ms);
        self.lock().insert(
            token.clone(),
            Session {
                user_id,
                expires_at_ms,
            },
        );
        Ok(IssuedSession {
            token,
            expires_at_ms,
        })
    }

    /// Resolve a token, deleting it if it has expired.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.lock();
        let session = *sessions.get(token)?;
        if session.expires_at_ms <= self.clock.now_ms() {
            sessions.remove(token);
            return None;
        }
        Some(session)
    }

    /// Delete a session, returning whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Generate a 32-byte random token, hex-encoded.
/// The raw value is only returned to the client; nothing else is derived
/// from it.
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(hex::encode(bytes))
}
