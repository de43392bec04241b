//! Payment initiation and verification endpoints.
//!
//! The gateway itself is an external collaborator; these handlers stop at
//! admission: bearer auth, payload validation, then an independent per-IP
//! fixed-window throttle per endpoint (initialize and verify do not share
//! state with each other or with login throttling). Validation failures
//! never consume a limiter slot.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use ulid::Ulid;
use utoipa::ToSchema;

use crate::api::state::AppState;
use crate::auth::{FixedWindowLimiter, RateLimitDecision};

use super::auth::principal::require_auth;
use super::auth::utils::{error_response, extract_client_ip, rate_limited_response};

const INITIALIZE_THROTTLED_MESSAGE: &str = "Too many payment initialization requests";
const VERIFY_THROTTLED_MESSAGE: &str = "Too many payment verification requests";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PaymentInitializeRequest {
    /// Amount in the smallest currency unit.
    pub amount: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PaymentInitializeResponse {
    pub reference: String,
    pub status: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PaymentVerifyRequest {
    pub reference: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PaymentVerifyResponse {
    pub reference: String,
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/v1/payments/initialize",
    request_body = PaymentInitializeRequest,
    responses(
        (status = 200, description = "Payment admitted for initialization", body = PaymentInitializeResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 429, description = "Rate limited")
    ),
    tag = "payments"
)]
pub async fn initialize(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<PaymentInitializeRequest>>,
) -> impl IntoResponse {
    if let Err(response) = require_auth(&headers, &state) {
        return response;
    }

    // Validation errors never consume a limiter slot.
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };
    if request.amount == 0 {
        return error_response(StatusCode::BAD_REQUEST, "Amount must be positive");
    }

    match admit(state.payment_initialize(), &headers, INITIALIZE_THROTTLED_MESSAGE) {
        Ok(()) => {}
        Err(response) => return response,
    }

    // Handed off to the gateway collaborator from here.
    let body = PaymentInitializeResponse {
        reference: Ulid::new().to_string(),
        status: "pending".to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/payments/verify",
    request_body = PaymentVerifyRequest,
    responses(
        (status = 200, description = "Verification admitted", body = PaymentVerifyResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 429, description = "Rate limited")
    ),
    tag = "payments"
)]
pub async fn verify(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<PaymentVerifyRequest>>,
) -> impl IntoResponse {
    if let Err(response) = require_auth(&headers, &state) {
        return response;
    }

    // Validation errors never consume a limiter slot.
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };
    if request.reference.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing reference");
    }

    match admit(state.payment_verify(), &headers, VERIFY_THROTTLED_MESSAGE) {
        Ok(()) => {}
        Err(response) => return response,
    }

    let body = PaymentVerifyResponse {
        reference: request.reference,
        status: "pending".to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Run the per-IP throttle for one payment endpoint.
fn admit(
    limiter: &FixedWindowLimiter,
    headers: &HeaderMap,
    throttled_message: &str,
) -> Result<(), axum::response::Response> {
    if let Err(err) = limiter.prune_expired() {
        error!("Failed to prune {}: {err}", limiter.namespace());
    }

    let client_ip = extract_client_ip(headers);
    match limiter.check_and_register(&client_ip) {
        Ok(RateLimitDecision::Allowed) => Ok(()),
        Ok(RateLimitDecision::Limited { retry_after_ms }) => {
            Err(rate_limited_response(throttled_message, retry_after_ms))
        }
        Err(err) => {
            error!("Throttle state unavailable for {}: {err}", limiter.namespace());
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Payment request failed",
            ))
        }
    }
}
