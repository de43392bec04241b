//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::users::User;
use crate::auth::Role;

use super::utils::format_expiry;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Sanitized user for response bodies. Never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: PublicUser,
}

impl LoginResponse {
    pub(crate) fn new(token: String, expires_at_ms: u64, user: &User) -> Self {
        Self {
            token,
            expires_at: format_expiry(expires_at_ms),
            user: user.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user: PublicUser,
    pub expires_at: String,
}
