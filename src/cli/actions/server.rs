use crate::api::{self, AppState, AuthConfig};
use crate::auth::Role;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

use super::Action;

/// Handle the server action.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        frontend_url,
        admin_email,
        admin_password,
        session_ttl_seconds,
    } = action;

    let config = AuthConfig::new(frontend_url).with_session_ttl_seconds(session_ttl_seconds);
    let state = AppState::new(config).context("Failed to initialize application state")?;

    // Seed the bootstrap super-admin; further accounts are created through
    // the role-gated register endpoint.
    let admin = state
        .users()
        .register(
            &admin_email,
            "Administrator",
            Role::SuperAdmin,
            admin_password.expose_secret(),
        )
        .context("Failed to seed super-admin account")?;
    info!(email = %admin.email, "seeded super-admin account");

    api::new(port, Arc::new(state)).await?;

    Ok(())
}
