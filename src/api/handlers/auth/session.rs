//! Session validation and logout endpoints for bearer auth.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::state::AppState;

use super::principal::require_auth;
use super::types::{PublicUser, SessionResponse};
use super::utils::{extract_bearer_token, format_expiry};

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "Missing, expired, or revoked session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    match require_auth(&headers, &state) {
        Ok(principal) => {
            let body = SessionResponse {
                user: PublicUser {
                    id: principal.user_id.to_string(),
                    email: principal.email,
                    name: principal.name,
                    role: principal.role,
                },
                expires_at: format_expiry(principal.session_expires_at_ms),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    // Revoking an unknown token is still a successful logout.
    if let Some(token) = extract_bearer_token(&headers) {
        state.sessions().revoke(&token);
    }
    StatusCode::NO_CONTENT
}
