//! Auth endpoints and the primitives they share with other handlers.

pub mod login;
pub mod principal;
pub mod register;
pub mod session;
pub mod types;
pub(crate) mod utils;

pub use login::login;
pub use register::register;
pub use session::{logout, session};
