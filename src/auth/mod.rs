//! Authentication and abuse-prevention primitives.
//!
//! Everything here is free of HTTP concerns: the handlers in [`crate::api`]
//! translate these decisions into status codes and headers.

pub mod clock;
pub mod lockout;
pub mod password;
pub mod rate_limit;
pub mod role;
pub mod session;
pub mod store;
pub mod users;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lockout::{LockoutStatus, LockoutTracker};
pub use rate_limit::{retry_after_seconds, FixedWindowLimiter, RateLimitDecision};
pub use role::Role;
pub use session::SessionManager;
pub use store::StateStore;
pub use users::UserDirectory;
