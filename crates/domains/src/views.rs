//! # View Records
//!
//! Derived, viewer-specific records assembled by the read paths. None of these
//! are ever persisted.

use serde::Serialize;

use crate::models::{Comment, Post, UserProfile, VoteType};

/// One row of a post listing.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    /// 1-based position, continuous across pages.
    pub index: usize,
    #[serde(flatten)]
    pub post: Post,
    pub author_profile: Option<UserProfile>,
    pub points: i64,
    pub comments: usize,
    /// The viewer's vote on this post, if any.
    pub vote: Option<VoteType>,
    pub hidden: bool,
}

/// Single-post page.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    #[serde(flatten)]
    pub post: Post,
    pub author_profile: Option<UserProfile>,
    pub points: i64,
    pub comments: usize,
    pub vote: Option<VoteType>,
    pub hidden: bool,
    pub favorited: bool,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentDetails {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_profile: Option<UserProfile>,
    pub vote: Option<VoteType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithKarma {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub karma: u64,
}

/// A comment with its replies, recursively.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

/// One entry of a pre-order, depth-annotated thread listing.
#[derive(Debug, Clone, Serialize)]
pub struct FlatComment {
    pub depth: u32,
    pub comment: Comment,
}
