//! # domains
//!
//! The data model and interface definitions for the forum core.
//!
//! Nothing in this crate performs I/O. Persistence is reached only through the
//! repository ports in [`ports`], implemented by `storage-adapters`; the rules
//! engines that sit on top of them live in `services`.

pub mod clock;
pub mod errors;
pub mod models;
pub mod ports;
pub mod rules;
pub mod session;
pub mod views;

// Re-exporting for easier access in other crates
pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{AppError, ErrorKind, Result};
pub use models::*;
pub use ports::*;
pub use rules::ForumRules;
pub use session::Session;
pub use views::*;
