//! # Tutela
//!
//! `tutela` is the authentication and abuse-prevention core for the school
//! platform. It owns password hashing (scrypt with constant-time
//! verification), opaque bearer sessions, role-based permission checks, and
//! the fixed-window rate limiters and account lockout that guard the login
//! and payment endpoints.
//!
//! ## Layout
//!
//! - [`auth`] — the domain layer: passwords, sessions, roles, limiters,
//!   lockout, and the namespaced state store they persist into.
//! - [`api`] — the axum HTTP surface and shared application state.
//! - [`cli`] — argument parsing, logging setup, and the server action.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
