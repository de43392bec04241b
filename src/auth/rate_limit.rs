//! Fixed-window rate limiting keyed by an arbitrary identifier.
//!
//! Each limiter owns one [`StateStore`] namespace mapping a key (client IP,
//! account id) to `{count, first_request_at}`. An entry older than the window
//! is logically expired and treated as absent; it is deleted lazily on the
//! next touch, so no sweep is required for correctness. `prune_expired` is an
//! opportunistic sweep to bound memory growth from one-off clients.
//!
//! Fixed-window counting tolerates a burst exactly at window boundaries; that
//! is acceptable for login/payment abuse deterrence and not suitable for
//! precise rate smoothing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::clock::Clock;
use super::store::{StateStore, StoreError};

/// Per-key window state persisted in the store.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WindowEntry {
    pub count: u32,
    pub first_request_at: u64,
}

type WindowTable = HashMap<String, WindowEntry>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_ms: u64 },
}

impl RateLimitDecision {
    #[must_use]
    pub const fn is_limited(self) -> bool {
        matches!(self, Self::Limited { .. })
    }
}

/// Convert a blocked decision's remaining window into a `Retry-After` value.
///
/// Always a positive number of whole seconds; HTTP clients interpret
/// `Retry-After: 0` inconsistently, so even a non-positive remainder yields 1.
#[must_use]
pub fn retry_after_seconds(retry_after_ms: u64) -> u64 {
    retry_after_ms.div_ceil(1000).max(1)
}

pub struct FixedWindowLimiter {
    namespace: String,
    window_ms: u64,
    max: u32,
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        window_ms: u64,
        max: u32,
        store: Arc<StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            window_ms,
            max,
            store,
            clock,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Probe the limiter without recording an attempt.
    ///
    /// Stale entries are deleted and persisted as a side effect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn evaluate(&self, key: &str) -> Result<RateLimitDecision, StoreError> {
        let now = self.clock.now_ms();
        self.store
            .update(&self.namespace, WindowTable::new, |table| {
                let Some(entry) = table.get(key) else {
                    return RateLimitDecision::Allowed;
                };
                let age = now.saturating_sub(entry.first_request_at);
                if age > self.window_ms {
                    table.remove(key);
                    return RateLimitDecision::Allowed;
                }
                if entry.count >= self.max {
                    return RateLimitDecision::Limited {
                        retry_after_ms: self.window_ms.saturating_sub(age),
                    };
                }
                RateLimitDecision::Allowed
            })
    }

    /// Record an attempt for `key`, starting a fresh window if the previous
    /// one elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn register(&self, key: &str) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        self.store
            .update(&self.namespace, WindowTable::new, |table| {
                Self::register_in(table, key, now, self.window_ms);
            })
    }

    /// Atomic increment-with-ceiling: probe and record in one store lock.
    ///
    /// This closes the check-then-register race two concurrent requests for
    /// the same key would otherwise have. Blocked attempts are not recorded,
    /// so being throttled does not extend the window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn check_and_register(&self, key: &str) -> Result<RateLimitDecision, StoreError> {
        let now = self.clock.now_ms();
        self.store
            .update(&self.namespace, WindowTable::new, |table| {
                if let Some(entry) = table.get(key) {
                    let age = now.saturating_sub(entry.first_request_at);
                    if age <= self.window_ms && entry.count >= self.max {
                        return RateLimitDecision::Limited {
                            retry_after_ms: self.window_ms.saturating_sub(age),
                        };
                    }
                }
                Self::register_in(table, key, now, self.window_ms);
                RateLimitDecision::Allowed
            })
    }

    /// Sweep every key whose window has elapsed, returning how many entries
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn prune_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now_ms();
        self.store
            .update(&self.namespace, WindowTable::new, |table| {
                let before = table.len();
                table.retain(|_, entry| {
                    now.saturating_sub(entry.first_request_at) <= self.window_ms
                });
                before - table.len()
            })
    }

    fn register_in(table: &mut WindowTable, key: &str, now: u64, window_ms: u64) {
        match table.get_mut(key) {
            Some(entry) if now.saturating_sub(entry.first_request_at) <= window_ms => {
                entry.count = entry.count.saturating_add(1);
            }
            _ => {
                table.insert(
                    key.to_string(),
                    WindowEntry {
                        count: 1,
                        first_request_at: now,
                    },
                );
            }
        }
    }
}
