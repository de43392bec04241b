//! Shared application state and auth configuration.

use anyhow::Result;
use std::sync::Arc;

use crate::auth::{
    Clock, FixedWindowLimiter, LockoutTracker, SessionManager, StateStore, SystemClock,
    UserDirectory,
};

// Persisted-state namespaces. Internal identifiers, but they must stay stable
// across restarts within a deployment so throttle history is not silently
// discarded.
pub const NS_LOGIN_THROTTLE: &str = "auth.loginThrottle";
pub const NS_LOGIN_LOCKOUT: &str = "auth.loginLockout";
pub const NS_PAYMENT_INITIALIZE: &str = "payments.initialize.rateLimit";
pub const NS_PAYMENT_VERIFY: &str = "payments.verify.rateLimit";

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_LOGIN_IP_MAX: u32 = 10;
const DEFAULT_LOGIN_IP_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_SECONDS: u64 = 15 * 60;
const DEFAULT_PAYMENT_INITIALIZE_MAX: u32 = 5;
const DEFAULT_PAYMENT_INITIALIZE_WINDOW_SECONDS: u64 = 60;
const DEFAULT_PAYMENT_VERIFY_MAX: u32 = 10;
const DEFAULT_PAYMENT_VERIFY_WINDOW_SECONDS: u64 = 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_ttl_seconds: u64,
    login_ip_max: u32,
    login_ip_window_seconds: u64,
    max_failed_attempts: u32,
    lockout_seconds: u64,
    payment_initialize_max: u32,
    payment_initialize_window_seconds: u64,
    payment_verify_max: u32,
    payment_verify_window_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            login_ip_max: DEFAULT_LOGIN_IP_MAX,
            login_ip_window_seconds: DEFAULT_LOGIN_IP_WINDOW_SECONDS,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            payment_initialize_max: DEFAULT_PAYMENT_INITIALIZE_MAX,
            payment_initialize_window_seconds: DEFAULT_PAYMENT_INITIALIZE_WINDOW_SECONDS,
            payment_verify_max: DEFAULT_PAYMENT_VERIFY_MAX,
            payment_verify_window_seconds: DEFAULT_PAYMENT_VERIFY_WINDOW_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_ip_limits(mut self, max: u32, window_seconds: u64) -> Self {
        self.login_ip_max = max;
        self.login_ip_window_seconds = window_seconds;
        self
    }

    #[must_use]
    pub fn with_lockout(mut self, max_failed_attempts: u32, lockout_seconds: u64) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self.lockout_seconds = lockout_seconds;
        self
    }

    #[must_use]
    pub fn with_payment_initialize_limits(mut self, max: u32, window_seconds: u64) -> Self {
        self.payment_initialize_max = max;
        self.payment_initialize_window_seconds = window_seconds;
        self
    }

    #[must_use]
    pub fn with_payment_verify_limits(mut self, max: u32, window_seconds: u64) -> Self {
        self.payment_verify_max = max;
        self.payment_verify_window_seconds = window_seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn lockout_seconds(&self) -> u64 {
        self.lockout_seconds
    }

    #[must_use]
    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }
}

/// Process-wide state shared by all handlers via `Extension`.
///
/// Explicitly constructed (no module-level singletons) so tests and
/// multi-tenant deployments can run isolated instances side by side.
pub struct AppState {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    store: Arc<StateStore>,
    users: UserDirectory,
    sessions: SessionManager,
    login_throttle: FixedWindowLimiter,
    payment_initialize: FixedWindowLimiter,
    payment_verify: FixedWindowLimiter,
    lockout: LockoutTracker,
}

impl AppState {
    /// Production wiring: system clock and a fresh store.
    ///
    /// # Errors
    ///
    /// Returns an error if the user directory cannot be initialized.
    pub fn new(config: AuthConfig) -> Result<Self> {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(StateStore::new()))
    }

    /// Wiring with an injected clock and store, used by tests to simulate
    /// elapsed time and inspect persisted throttle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the user directory cannot be initialized.
    pub fn with_parts(
        config: AuthConfig,
        clock: Arc<dyn Clock>,
        store: Arc<StateStore>,
    ) -> Result<Self> {
        let sessions = SessionManager::new(clock.clone(), config.session_ttl_seconds * 1000);
        let login_throttle = FixedWindowLimiter::new(
            NS_LOGIN_THROTTLE,
            config.login_ip_window_seconds * 1000,
            config.login_ip_max,
            store.clone(),
            clock.clone(),
        );
        let payment_initialize = FixedWindowLimiter::new(
            NS_PAYMENT_INITIALIZE,
            config.payment_initialize_window_seconds * 1000,
            config.payment_initialize_max,
            store.clone(),
            clock.clone(),
        );
        let payment_verify = FixedWindowLimiter::new(
            NS_PAYMENT_VERIFY,
            config.payment_verify_window_seconds * 1000,
            config.payment_verify_max,
            store.clone(),
            clock.clone(),
        );
        let lockout = LockoutTracker::new(
            NS_LOGIN_LOCKOUT,
            config.max_failed_attempts,
            config.lockout_seconds * 1000,
            store.clone(),
            clock.clone(),
        );

        Ok(Self {
            users: UserDirectory::new()?,
            sessions,
            login_throttle,
            payment_initialize,
            payment_verify,
            lockout,
            config,
            clock,
            store,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    #[must_use]
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn login_throttle(&self) -> &FixedWindowLimiter {
        &self.login_throttle
    }

    #[must_use]
    pub fn payment_initialize(&self) -> &FixedWindowLimiter {
        &self.payment_initialize
    }

    #[must_use]
    pub fn payment_verify(&self) -> &FixedWindowLimiter {
        &self.payment_verify
    }

    #[must_use]
    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }
}
