//! Password login endpoint.
//!
//! Two independent gates run before credentials are checked: the per-IP
//! fixed-window throttle, then the per-account lockout. Either one can
//! produce a 429 on its own. Validation failures never touch the limiters or
//! the credential store.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::state::AppState;
use crate::auth::session::IssuedSession;
use crate::auth::users::{normalize_email, User};
use crate::auth::LockoutStatus;

use super::types::{LoginRequest, LoginResponse};
use super::utils::{
    error_response, extract_client_ip, rate_limited_response, valid_email,
};

const IP_THROTTLED_MESSAGE: &str = "Too many login attempts from this IP";
const ACCOUNT_LOCKED_MESSAGE: &str = "Account temporarily locked";
const BAD_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Rate limited or account locked")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email");
    }
    if request.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing password");
    }

    // Opportunistic sweep; evaluate/register self-heal stale entries, this
    // only bounds key-space growth from one-off clients.
    if let Err(err) = state.login_throttle().prune_expired() {
        error!("Failed to prune login throttle: {err}");
    }

    let client_ip = extract_client_ip(&headers);
    match state.login_throttle().check_and_register(&client_ip) {
        Ok(decision) => {
            if let crate::auth::RateLimitDecision::Limited { retry_after_ms } = decision {
                info!(client_ip, "login throttled");
                return rate_limited_response(IP_THROTTLED_MESSAGE, retry_after_ms);
            }
        }
        Err(err) => {
            error!("Login throttle state unavailable: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
        }
    }

    match state.lockout().status(&email) {
        Ok(LockoutStatus::Locked { retry_after_ms }) => {
            return rate_limited_response(ACCOUNT_LOCKED_MESSAGE, retry_after_ms);
        }
        Ok(LockoutStatus::Open) => {}
        Err(err) => {
            error!("Lockout state unavailable: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
        }
    }

    let Some(user) = state.users().verify_credentials(&email, &request.password) else {
        // One uniform failure path for unknown email and wrong password.
        return match state.lockout().record_failure(&email) {
            Ok(LockoutStatus::Locked { retry_after_ms }) => {
                info!(account = email, "account locked after repeated failures");
                rate_limited_response(ACCOUNT_LOCKED_MESSAGE, retry_after_ms)
            }
            Ok(LockoutStatus::Open) => {
                error_response(StatusCode::UNAUTHORIZED, BAD_CREDENTIALS_MESSAGE)
            }
            Err(err) => {
                error!("Failed to record login failure: {err}");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed")
            }
        };
    };

    if let Err(err) = state.lockout().record_success(&email) {
        error!("Failed to reset lockout counter: {err}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
    }

    match state.sessions().create(user.id) {
        Ok(issued) => issue_response(issued, &user),
        Err(err) => {
            error!("Failed to create session: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed")
        }
    }
}

fn issue_response(issued: IssuedSession, user: &User) -> Response {
    let body = LoginResponse::new(issued.token, issued.expires_at_ms, user);
    (StatusCode::OK, Json(body)).into_response()
}
