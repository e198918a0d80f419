//! # Forum Services
//!
//! The leaf rules engines (votes, karma, marks, comments, posts, users), the
//! feed ranker composed from them, and the cross-component action flows.

pub mod comments;
pub mod feed;
pub mod forum;
pub mod karma;
pub mod marks;
pub mod posts;
pub mod thread;
pub mod users;
pub mod votes;

pub use comments::CommentTree;
pub use feed::{rank_score, FeedRanker, FeedRequest, FeedSources, Page};
pub use forum::{CommentVoteAction, ForumService, PostVoteAction};
pub use karma::KarmaStore;
pub use marks::{MarkOutcome, MarkStore};
pub use posts::PostStore;
pub use thread::CommentThread;
pub use users::UserDirectory;
pub use votes::VoteLedger;
