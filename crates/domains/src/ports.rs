//! # Repository Ports
//!
//! Any storage adapter must implement these traits to back the services.
//!
//! # Developer Note
//! Ports report infrastructure failures through `anyhow::Result`. Business
//! outcomes that must be decided atomically inside the store (duplicate
//! insert, karma floor, leaf-only delete) come back as plain values so the
//! check and the write can never be split across two round-trips.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Comment, ItemId, KarmaDecrement, LeafDeletion, Mark, MarkNamespace, Post, PostFilter, Tally,
    UserId, UserProfile, Vote, VoteTarget,
};

/// Vote records, one collection per [`VoteTarget`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Inserts unless a vote for (author, item) already exists.
    /// Returns `false` when the pair was taken.
    async fn insert_if_absent(&self, target: VoteTarget, vote: &Vote) -> anyhow::Result<bool>;

    /// Removes and returns the vote for (author, item), if any.
    async fn remove(
        &self,
        target: VoteTarget,
        author: UserId,
        item: ItemId,
    ) -> anyhow::Result<Option<Vote>>;

    async fn find(
        &self,
        target: VoteTarget,
        author: UserId,
        item: ItemId,
    ) -> anyhow::Result<Option<Vote>>;

    /// Every vote cast by `author`, oldest first.
    async fn find_by_author(&self, target: VoteTarget, author: UserId)
        -> anyhow::Result<Vec<Vote>>;

    /// Votes cast by `author` on any of `items`.
    async fn find_for_items(
        &self,
        target: VoteTarget,
        author: UserId,
        items: &[ItemId],
    ) -> anyhow::Result<Vec<Vote>>;

    async fn tally(&self, target: VoteTarget, item: ItemId) -> anyhow::Result<Tally>;

    /// Tallies for many items. Items without votes may be omitted.
    async fn tallies(
        &self,
        target: VoteTarget,
        items: &[ItemId],
    ) -> anyhow::Result<HashMap<ItemId, Tally>>;
}

/// Per-user karma counters.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KarmaRepository: Send + Sync {
    /// `None` when the user has no record yet.
    async fn points(&self, user: UserId) -> anyhow::Result<Option<u64>>;

    /// Atomic upsert-and-add. Returns the new total.
    async fn add(&self, user: UserId, n: u64) -> anyhow::Result<u64>;

    /// Atomic conditional subtract; never leaves a negative total.
    async fn subtract(&self, user: UserId, n: u64) -> anyhow::Result<KarmaDecrement>;
}

/// Per-(user, item) boolean tags, partitioned by [`MarkNamespace`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MarkRepository: Send + Sync {
    /// Returns `false` if the mark already existed.
    async fn insert_if_absent(&self, namespace: MarkNamespace, mark: &Mark)
        -> anyhow::Result<bool>;

    /// Returns `false` if there was nothing to remove.
    async fn remove(
        &self,
        namespace: MarkNamespace,
        user: UserId,
        item: ItemId,
    ) -> anyhow::Result<bool>;

    async fn exists(
        &self,
        namespace: MarkNamespace,
        user: UserId,
        item: ItemId,
    ) -> anyhow::Result<bool>;

    /// Oldest first.
    async fn by_user(&self, namespace: MarkNamespace, user: UserId) -> anyhow::Result<Vec<Mark>>;

    async fn by_item(&self, namespace: MarkNamespace, item: ItemId) -> anyhow::Result<Vec<Mark>>;

    async fn by_items(
        &self,
        namespace: MarkNamespace,
        items: &[ItemId],
    ) -> anyhow::Result<Vec<Mark>>;
}

/// Comment storage. Listings come back in insertion order.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Inserts `comment`. A reply to a comment (`depth > 0`) is refused with
    /// `false` if its parent is gone; the check and the insert are atomic.
    async fn insert(&self, comment: &Comment) -> anyhow::Result<bool>;

    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Comment>>;

    /// Returns the updated comment, or `None` if `id` is unknown.
    async fn update_content(
        &self,
        id: ItemId,
        content: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Comment>>;

    /// Deletes `id` only if no comment names it as parent, atomically.
    async fn delete_leaf(&self, id: ItemId) -> anyhow::Result<LeafDeletion>;

    /// Every comment in the thread rooted at `root`.
    async fn by_root(&self, root: ItemId) -> anyhow::Result<Vec<Comment>>;

    async fn by_author(&self, author: UserId) -> anyhow::Result<Vec<Comment>>;

    /// Thread sizes. Roots without comments may be omitted.
    async fn count_by_roots(&self, roots: &[ItemId]) -> anyhow::Result<HashMap<ItemId, usize>>;
}

/// Post storage. Listings come back newest first.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: &Post) -> anyhow::Result<()>;

    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Post>>;

    async fn get_many(&self, ids: &[ItemId]) -> anyhow::Result<Vec<Post>>;

    /// Whole-record replace keyed by `post.id`. Returns `false` if unknown.
    async fn replace(&self, post: &Post) -> anyhow::Result<bool>;

    async fn delete(&self, id: ItemId) -> anyhow::Result<bool>;

    async fn find(&self, filter: &PostFilter) -> anyhow::Result<Vec<Post>>;

    async fn by_author(&self, author: UserId) -> anyhow::Result<Vec<Post>>;
}

/// User profiles. Usernames are unique.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns `false` if the username is taken.
    async fn insert(&self, profile: &UserProfile) -> anyhow::Result<bool>;

    async fn get(&self, id: UserId) -> anyhow::Result<Option<UserProfile>>;

    async fn get_by_username(&self, username: &str) -> anyhow::Result<Option<UserProfile>>;

    async fn get_many(&self, ids: &[UserId]) -> anyhow::Result<Vec<UserProfile>>;

    /// Returns `false` if `profile.id` is unknown.
    async fn update(&self, profile: &UserProfile) -> anyhow::Result<bool>;
}

/// The full set of ports a storage adapter hands to the services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub karma: Arc<dyn KarmaRepository>,
    pub marks: Arc<dyn MarkRepository>,
}
