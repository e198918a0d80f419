//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque id of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Id of a votable / markable item. Posts and comments share one id space so
/// a comment's `parent` can name either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        UserId(Uuid::now_v7())
    }
}

impl ItemId {
    pub fn new() -> Self {
        ItemId(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Votes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "up" => Some(VoteType::Up),
            "down" => Some(VoteType::Down),
            _ => None,
        }
    }
}

/// Which ledger a vote belongs to. Post votes and comment votes are separate
/// collections with identical rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTarget {
    Post,
    Comment,
}

impl VoteTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteTarget::Post => "post_votes",
            VoteTarget::Comment => "comment_votes",
        }
    }
}

/// At most one exists per (author, item) pair. Never updated in place:
/// changing direction is unvote followed by a fresh vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub author: UserId,
    pub item: ItemId,
    #[serde(rename = "type")]
    pub kind: VoteType,
    pub created_at: DateTime<Utc>,
}

/// Raw up/down counts for one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub up: u64,
    pub down: u64,
}

impl Tally {
    pub fn points(&self) -> i64 {
        self.up as i64 - self.down as i64
    }
}

// ── Karma ────────────────────────────────────────────────────────────────────

/// Non-negative reputation counter. Absent record means zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Karma {
    pub user: UserId,
    pub points: u64,
}

/// Result of an atomic conditional decrement at the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KarmaDecrement {
    /// The decrement was applied; carries the new total.
    Applied(u64),
    /// No record exists for the user.
    Missing,
    /// The record holds fewer points than requested; carries current total.
    Insufficient(u64),
}

// ── Marks ────────────────────────────────────────────────────────────────────

/// The three disjoint mark-sets. Each behaves as its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkNamespace {
    Favorite,
    Hide,
    Flag,
}

impl MarkNamespace {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkNamespace::Favorite => "favorites",
            MarkNamespace::Hide => "hides",
            MarkNamespace::Flag => "flags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub user: UserId,
    pub item: ItemId,
    pub created_at: DateTime<Utc>,
}

// ── Comments ─────────────────────────────────────────────────────────────────

/// A threaded reply. `root` and `depth` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: ItemId,
    pub author: UserId,
    pub content: String,
    /// Either a comment or a post.
    pub parent: ItemId,
    /// The post this comment ultimately belongs to.
    pub root: ItemId,
    /// 0 for direct replies to the post.
    pub depth: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a new comment lands in its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub root: ItemId,
    pub depth: u32,
}

impl Placement {
    /// Derives root/depth from the parent lookup result. `parent_comment` is
    /// `None` when `parent` is not a comment, i.e. it is the post itself.
    pub fn under(parent: ItemId, parent_comment: Option<&Comment>) -> Self {
        match parent_comment {
            Some(c) => Placement {
                root: c.root,
                depth: c.depth + 1,
            },
            None => Placement {
                root: parent,
                depth: 0,
            },
        }
    }
}

/// Outcome of an atomic "delete only if no replies" at the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafDeletion {
    Deleted,
    Missing,
    HasReplies,
}

// ── Posts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: ItemId,
    pub author: UserId,
    pub title: String,
    pub url: Option<String>,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Whether the author may still edit or delete this post at `now`.
    pub fn within_window(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.created_at <= window
    }
}

/// Caller-supplied post contents for create and edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub url: Option<String>,
    pub text: Option<String>,
}

impl PostDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        PostDraft {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Candidate filter for post listings. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub created_from: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
    /// Case-insensitive title prefix.
    pub title_prefix: Option<String>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(from) = self.created_from {
            if post.created_at < from {
                return false;
            }
        }
        if let Some(until) = self.created_until {
            if post.created_at > until {
                return false;
            }
        }
        match &self.title_prefix {
            Some(prefix) => post
                .title
                .to_lowercase()
                .starts_with(&prefix.to_lowercase()),
            None => true,
        }
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_bar_color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// The profile as seen by anyone but its owner.
    pub fn public(mut self) -> Self {
        self.email = None;
        self.top_bar_color = None;
        self
    }
}
