//! Admin-gated user registration.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::api::state::AppState;
use crate::auth::users::{normalize_email, RegisterError};
use crate::auth::Role;

use super::principal::{require_auth, require_role};
use super::types::PublicUser;
use super::utils::{error_response, valid_email};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub role: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = PublicUser),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Insufficient permissions"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &state) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    if let Err(response) = require_role(&principal, Role::Admin) {
        return response;
    }

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
    // Unknown role strings are rejected here at the boundary.
    let Ok(role) = request.role.parse::<Role>() else {
        return error_response(StatusCode::BAD_REQUEST, "Unknown role");
    };

    match state
        .users()
        .register(&email, request.name.trim(), role, &request.password)
    {
        Ok(user) => (StatusCode::CREATED, Json(PublicUser::from(&user))).into_response(),
        Err(RegisterError::DuplicateEmail) => {
            error_response(StatusCode::CONFLICT, "Email already registered")
        }
        Err(err) => {
            error!("Failed to register user: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed")
        }
    }
}
