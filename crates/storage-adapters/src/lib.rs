//! # Storage Adapters
//!
//! Implementations of the repository ports in `domains::ports`.
//!
//! - [`memory`]: always compiled; process-local, lost on drop.
//! - `sqlite`: behind the `db-sqlite` feature; uniqueness rules are real
//!   `UNIQUE` constraints and conditional writes.

pub mod memory;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;
