//! Small helpers shared by the auth and payment handlers.

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat};
use regex::Regex;
use serde_json::json;

use crate::auth::retry_after_seconds;

/// Shared bucket for requests without forwarding headers. A documented
/// limitation: all such clients throttle together.
pub(crate) const UNKNOWN_CLIENT: &str = "unknown";

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Extract a client IP for rate limiting from common proxy headers.
///
/// Prefers the first `X-Forwarded-For` entry, falls back to `X-Real-IP`,
/// else [`UNKNOWN_CLIENT`].
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
}

/// Extract a bearer token from `Authorization`, if present and non-empty.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Epoch milliseconds as an RFC 3339 timestamp for response bodies.
pub(crate) fn format_expiry(epoch_ms: u64) -> String {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(String::new, |at| {
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        })
}

/// `{ "error": ... }` body with a status code.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// 429 with a `Retry-After` header derived from the remaining window.
pub(crate) fn rate_limited_response(message: &str, retry_after_ms: u64) -> Response {
    let mut response = error_response(StatusCode::TOO_MANY_REQUESTS, message);
    if let Ok(value) = retry_after_seconds(retry_after_ms).to_string().parse() {
        response.headers_mut().insert("retry-after", value);
    }
    response
}
