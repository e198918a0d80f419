//! In-memory adapters for tests, demos and short-lived processes.
//!
//! Keyed collections live in `DashMap`s so the entry API can decide
//! uniqueness under the shard lock. Collections whose invariants span
//! several records (comment leaf deletion) sit behind one `RwLock`.

mod comments;
mod karma;
mod marks;
mod posts;
mod users;
mod votes;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use domains::Repositories;

pub use comments::InMemoryCommentRepository;
pub use karma::InMemoryKarmaRepository;
pub use marks::InMemoryMarkRepository;
pub use posts::InMemoryPostRepository;
pub use users::InMemoryUserRepository;
pub use votes::InMemoryVoteRepository;

/// A fresh, empty set of in-memory repositories.
pub fn repositories() -> Repositories {
    Repositories {
        users: Arc::new(InMemoryUserRepository::new()),
        posts: Arc::new(InMemoryPostRepository::new()),
        comments: Arc::new(InMemoryCommentRepository::new()),
        votes: Arc::new(InMemoryVoteRepository::new()),
        karma: Arc::new(InMemoryKarmaRepository::new()),
        marks: Arc::new(InMemoryMarkRepository::new()),
    }
}

/// Insertion counter; orders records that share a timestamp.
#[derive(Debug, Default)]
pub(crate) struct Sequence(AtomicU64);

impl Sequence {
    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

pub(crate) fn poisoned<T>(err: PoisonError<T>) -> anyhow::Error {
    anyhow::anyhow!("lock poisoned: {err}")
}
