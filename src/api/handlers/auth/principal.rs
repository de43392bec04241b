//! Authenticated principal extraction and authorization helpers.
//!
//! Resolve the bearer token to a session, then re-derive identity from the
//! backing user record: a revoked token, an expired session, or a deactivated
//! user all fail the same way on the next validation.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::auth::Role;

use super::utils::{error_response, extract_bearer_token};

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub session_expires_at_ms: u64,
}

/// Resolve the bearer token into a principal, or a ready 401 response.
///
/// # Errors
///
/// Returns a 401 response when the token is missing, unknown, expired, or
/// the backing user is gone or deactivated.
pub fn require_auth(headers: &HeaderMap, state: &AppState) -> Result<Principal, Response> {
    let unauthorized = || error_response(StatusCode::UNAUTHORIZED, "Authentication required");

    let token = extract_bearer_token(headers).ok_or_else(unauthorized)?;
    let session = state.sessions().get(&token).ok_or_else(unauthorized)?;
    let user = state
        .users()
        .find_by_id(session.user_id)
        .filter(|user| user.active)
        .ok_or_else(unauthorized)?;

    Ok(Principal {
        user_id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        session_expires_at_ms: session.expires_at_ms,
    })
}

/// Require at least `required` rank, or a ready 403 response.
///
/// # Errors
///
/// Returns a 403 response when the principal's role ranks below `required`.
pub fn require_role(principal: &Principal, required: Role) -> Result<(), Response> {
    if principal.role.has_permission(required) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "Insufficient permissions",
        ))
    }
}
