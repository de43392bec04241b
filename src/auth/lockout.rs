//! Account-scoped lockout after repeated authentication failures.
//!
//! Tracked per normalized account identifier in its own store namespace,
//! independent of the per-IP login throttle: an attacker rotating IPs cannot
//! bypass the lockout, and a legitimate user on one IP is not locked out by
//! noise from others. Once a lockout expires the failure counter resets and
//! ordinary 401-on-bad-credentials behavior resumes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::clock::Clock;
use super::store::{StateStore, StoreError};

/// Per-account failure state persisted in the store.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LockoutRecord {
    pub failure_count: u32,
    pub locked_until: Option<u64>,
}

type LockoutTable = HashMap<String, LockoutRecord>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockoutStatus {
    Open,
    Locked { retry_after_ms: u64 },
}

impl LockoutStatus {
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

pub struct LockoutTracker {
    namespace: String,
    max_failures: u32,
    lockout_ms: u64,
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
}

impl LockoutTracker {
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        max_failures: u32,
        lockout_ms: u64,
        store: Arc<StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            max_failures,
            lockout_ms,
            store,
            clock,
        }
    }

    /// Whether `account` is currently locked.
    ///
    /// An expired lockout is cleared here, resetting the failure counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn status(&self, account: &str) -> Result<LockoutStatus, StoreError> {
        let now = self.clock.now_ms();
        self.store
            .update(&self.namespace, LockoutTable::new, |table| {
                let Some(record) = table.get(account) else {
                    return LockoutStatus::Open;
                };
                match record.locked_until {
                    Some(until) if now < until => LockoutStatus::Locked {
                        retry_after_ms: until - now,
                    },
                    Some(_) => {
                        // Lockout elapsed: the account starts over.
                        table.remove(account);
                        LockoutStatus::Open
                    }
                    None => LockoutStatus::Open,
                }
            })
    }

    /// Record a failed credential check, locking the account once the
    /// failure count reaches the threshold.
    ///
    /// Returns the resulting status so the caller can distinguish "just
    /// locked" (429 at full lockout duration) from an ordinary failure (401).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn record_failure(&self, account: &str) -> Result<LockoutStatus, StoreError> {
        let now = self.clock.now_ms();
        self.store
            .update(&self.namespace, LockoutTable::new, |table| {
                let record = table.entry(account.to_string()).or_default();

                // A stale lockout from a previous cycle resets the counter
                // before the new failure is counted.
                if record.locked_until.is_some_and(|until| now >= until) {
                    *record = LockoutRecord::default();
                }

                record.failure_count = record.failure_count.saturating_add(1);
                if record.failure_count >= self.max_failures {
                    let until = now.saturating_add(self.lockout_ms);
                    record.locked_until = Some(until);
                    return LockoutStatus::Locked {
                        retry_after_ms: self.lockout_ms,
                    };
                }
                LockoutStatus::Open
            })
    }

    /// Reset the failure counter after a successful credential check.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the namespace state cannot be decoded or
    /// re-encoded.
    pub fn record_success(&self, account: &str) -> Result<(), StoreError> {
        self.store
            .update(&self.namespace, LockoutTable::new, |table| {
                table.remove(account);
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    const MAX_FAILURES: u32 = 5;
    const LOCKOUT_MS: u64 = 15 * 60 * 1000;

    fn tracker() -> (Arc<ManualClock>, LockoutTracker) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = Arc::new(StateStore::new());
        let tracker = LockoutTracker::new(
            "test.lockout",
            MAX_FAILURES,
            LOCKOUT_MS,
            store,
            clock.clone(),
        );
        (clock, tracker)
    }

    #[test]
    fn fresh_account_is_open() -> Result<(), StoreError> {
        let (_clock, tracker) = tracker();
        assert_eq!(tracker.status("a@example.com")?, LockoutStatus::Open);
        Ok(())
    }

    #[test]
    fn locks_exactly_at_threshold() -> Result<(), StoreError> {
        let (_clock, tracker) = tracker();
        for _ in 0..MAX_FAILURES - 1 {
            assert_eq!(
                tracker.record_failure("a@example.com")?,
                LockoutStatus::Open
            );
            assert_eq!(tracker.status("a@example.com")?, LockoutStatus::Open);
        }

        let status = tracker.record_failure("a@example.com")?;
        assert_eq!(
            status,
            LockoutStatus::Locked {
                retry_after_ms: LOCKOUT_MS
            }
        );
        assert!(tracker.status("a@example.com")?.is_locked());
        Ok(())
    }

    #[test]
    fn retry_after_shrinks_within_lockout() -> Result<(), StoreError> {
        let (clock, tracker) = tracker();
        for _ in 0..MAX_FAILURES {
            tracker.record_failure("a@example.com")?;
        }

        clock.advance(60_000);
        assert_eq!(
            tracker.status("a@example.com")?,
            LockoutStatus::Locked {
                retry_after_ms: LOCKOUT_MS - 60_000
            }
        );
        Ok(())
    }

    #[test]
    fn lockout_expiry_resets_the_counter() -> Result<(), StoreError> {
        let (clock, tracker) = tracker();
        for _ in 0..MAX_FAILURES {
            tracker.record_failure("a@example.com")?;
        }

        clock.advance(LOCKOUT_MS);
        assert_eq!(tracker.status("a@example.com")?, LockoutStatus::Open);

        // The counter restarted: one more failure does not re-lock.
        assert_eq!(
            tracker.record_failure("a@example.com")?,
            LockoutStatus::Open
        );
        Ok(())
    }

    #[test]
    fn failure_after_expired_lockout_starts_fresh_cycle() -> Result<(), StoreError> {
        let (clock, tracker) = tracker();
        for _ in 0..MAX_FAILURES {
            tracker.record_failure("a@example.com")?;
        }
        clock.advance(LOCKOUT_MS + 1);

        // Without an intervening status check, record_failure itself must
        // notice the stale lockout.
        assert_eq!(
            tracker.record_failure("a@example.com")?,
            LockoutStatus::Open
        );
        assert_eq!(tracker.status("a@example.com")?, LockoutStatus::Open);
        Ok(())
    }

    #[test]
    fn success_resets_immediately() -> Result<(), StoreError> {
        let (_clock, tracker) = tracker();
        for _ in 0..MAX_FAILURES - 1 {
            tracker.record_failure("a@example.com")?;
        }

        tracker.record_success("a@example.com")?;

        // Counter is back at zero: the next failure is the first of a new
        // cycle, far from the threshold.
        assert_eq!(
            tracker.record_failure("a@example.com")?,
            LockoutStatus::Open
        );
        Ok(())
    }

    #[test]
    fn accounts_are_independent() -> Result<(), StoreError> {
        let (_clock, tracker) = tracker();
        for _ in 0..MAX_FAILURES {
            tracker.record_failure("a@example.com")?;
        }
        assert!(tracker.status("a@example.com")?.is_locked());
        assert_eq!(tracker.status("b@example.com")?, LockoutStatus::Open);
        Ok(())
    }
}
