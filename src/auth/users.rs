//! In-memory user directory with credential verification.
//!
//! Emails are case-insensitively unique; the normalized form is the map key.
//! Credential checks for unknown or deactivated accounts still derive a key
//! against a dummy hash so the flow stays indistinguishable from a wrong
//! password.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::role::Role;

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub active: bool,
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserDirectory {
    // Keyed by normalized email.
    users: Mutex<HashMap<String, User>>,
    dummy_hash: String,
}

impl UserDirectory {
    /// # Errors
    ///
    /// Returns an error if the dummy hash cannot be derived.
    pub fn new() -> Result<Self> {
        // Burned once at startup so unknown-user lookups pay the same scrypt
        // cost as real verifications.
        let dummy_hash = hash_password(&Uuid::new_v4().to_string())
            .context("failed to prepare dummy credential")?;
        Ok(Self {
            users: Mutex::new(HashMap::new()),
            dummy_hash,
        })
    }

    /// Register a user, hashing the supplied password.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError::DuplicateEmail`] when the email is already
    /// registered (compared case-insensitively), or an internal error when
    /// hashing fails.
    pub fn register(
        &self,
        email: &str,
        name: &str,
        role: Role,
        password: &str,
    ) -> Result<User, RegisterError> {
        let normalized = normalize_email(email);
        let password_hash = hash_password(password)?;
        let user = User {
            id: Uuid::new_v4(),
            email: normalized.clone(),
            name: name.to_string(),
            role,
            password_hash,
            active: true,
        };

        let mut users = self.lock();
        if users.contains_key(&normalized) {
            return Err(RegisterError::DuplicateEmail);
        }
        users.insert(normalized, user.clone());
        Ok(user)
    }

    /// Verify credentials, returning the user on success.
    ///
    /// Unknown email, wrong password, and deactivated account are all the
    /// same `None`; callers must not leak which one it was.
    #[must_use]
    pub fn verify_credentials(&self, email: &str, password: &str) -> Option<User> {
        let normalized = normalize_email(email);
        let candidate = self.lock().get(&normalized).cloned();

        match candidate {
            Some(user) => {
                if verify_password(password, &user.password_hash) && user.active {
                    Some(user)
                } else {
                    None
                }
            }
            None => {
                // Same scrypt cost as the real path.
                let _ = verify_password(password, &self.dummy_hash);
                None
            }
        }
    }

    #[must_use]
    pub fn find_by_id(&self, id: Uuid) -> Option<User> {
        self.lock().values().find(|user| user.id == id).cloned()
    }

    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.lock().get(&normalize_email(email)).cloned()
    }

    /// Replace the stored hash entirely (password reset).
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails or the account does not exist.
    pub fn reset_password(&self, email: &str, new_password: &str) -> Result<()> {
        let normalized = normalize_email(email);
        let password_hash = hash_password(new_password)?;
        let mut users = self.lock();
        let user = users
            .get_mut(&normalized)
            .ok_or_else(|| anyhow!("no such account"))?;
        user.password_hash = password_hash;
        Ok(())
    }

    /// Activate or deactivate an account; takes effect on the next session
    /// validation.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        let mut users = self.lock();
        for user in users.values_mut() {
            if user.id == id {
                user.active = active;
                return true;
            }
        }
        false
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
