//! # ForumService
//!
//! The action flows that cross component boundaries: self-upvotes on create,
//! karma side effects of votes, karma gates in front of privileged actions,
//! and the no-comments rule on post deletion.
//!
//! # Developer Note
//! Within one flow the steps run strictly in order, and every precondition
//! (self-vote, karma gate, existence) is checked before the first write.
//! Each flow maps onto one endpoint of the request layer.

use std::sync::Arc;

use domains::{
    AppError, Clock, CommentDetails, ForumRules, ItemId, Post, PostDetails, PostDraft, PostView,
    Repositories, Result, Session, UserId, UserProfile, UserWithKarma, VoteTarget, VoteType,
};
use domains::{Comment, ErrorKind, MarkNamespace};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::comments::CommentTree;
use crate::feed::{FeedRanker, FeedRequest, FeedSources};
use crate::karma::KarmaStore;
use crate::marks::{MarkOutcome, MarkStore};
use crate::posts::PostStore;
use crate::thread::CommentThread;
use crate::users::UserDirectory;
use crate::votes::VoteLedger;

/// Vote actions accepted on posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostVoteAction {
    Up,
    Unvote,
}

/// Vote actions accepted on comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentVoteAction {
    Upvote,
    Downvote,
    Unvote,
}

pub struct ForumService {
    users: Arc<UserDirectory>,
    posts: Arc<PostStore>,
    comments: Arc<CommentTree>,
    post_votes: Arc<VoteLedger>,
    comment_votes: Arc<VoteLedger>,
    karma: KarmaStore,
    favorites: Arc<MarkStore>,
    hides: Arc<MarkStore>,
    flags: Arc<MarkStore>,
    feed: FeedRanker,
    rules: ForumRules,
}

impl ForumService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, rules: ForumRules) -> Self {
        let users = Arc::new(UserDirectory::new(repos.users, clock.clone(), &rules));
        let posts = Arc::new(PostStore::new(repos.posts, clock.clone(), rules.clone()));
        let comments = Arc::new(CommentTree::new(repos.comments, clock.clone()));
        let post_votes = Arc::new(VoteLedger::new(
            VoteTarget::Post,
            repos.votes.clone(),
            clock.clone(),
        ));
        let comment_votes = Arc::new(VoteLedger::new(
            VoteTarget::Comment,
            repos.votes,
            clock.clone(),
        ));
        let mark_store =
            |ns: MarkNamespace| Arc::new(MarkStore::new(ns, repos.marks.clone(), clock.clone()));
        let favorites = mark_store(MarkNamespace::Favorite);
        let hides = mark_store(MarkNamespace::Hide);
        let flags = mark_store(MarkNamespace::Flag);

        let feed = FeedRanker::new(
            FeedSources {
                posts: posts.clone(),
                votes: post_votes.clone(),
                comments: comments.clone(),
                users: users.clone(),
                flags: flags.clone(),
                hides: hides.clone(),
                favorites: favorites.clone(),
            },
            clock,
            rules.clone(),
        );

        Self {
            users,
            posts,
            comments,
            post_votes,
            comment_votes,
            karma: KarmaStore::new(repos.karma),
            favorites,
            hides,
            flags,
            feed,
            rules,
        }
    }

    // ---- users -------------------------------------------------------------

    /// Creates a profile and grants the signup karma.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(&self, session: &Session, username: &str) -> Result<UserWithKarma> {
        session.assert_logged_out()?;
        let profile = self.users.create(username).await?;
        let karma = self
            .karma
            .increase(profile.id, self.rules.signup_karma)
            .await?;
        Ok(UserWithKarma { profile, karma })
    }

    pub async fn session_user(&self, session: &Session) -> Result<UserWithKarma> {
        let user = session.require_principal()?;
        let profile = self.users.get_by_id(user).await?;
        let karma = self.karma.get(user).await?;
        Ok(UserWithKarma { profile, karma })
    }

    /// Anyone's profile; email and top bar color only for its owner.
    pub async fn user_profile(&self, session: &Session, username: &str) -> Result<UserWithKarma> {
        let profile = self.users.get_by_username(username).await?;
        let karma = self.karma.get(profile.id).await?;
        let profile = if session.principal() == Some(profile.id) {
            profile
        } else {
            profile.public()
        };
        Ok(UserWithKarma { profile, karma })
    }

    pub async fn update_profile(
        &self,
        session: &Session,
        email: Option<String>,
        bio: Option<String>,
    ) -> Result<UserProfile> {
        let user = session.require_principal()?;
        self.users.update(user, email, bio).await
    }

    #[instrument(skip_all, fields(user = ?session.principal()))]
    pub async fn change_top_bar_color(&self, session: &Session, color: &str) -> Result<UserProfile> {
        let user = session.require_principal()?;
        self.karma
            .require_at_least(user, self.rules.top_bar_karma)
            .await?;
        self.users.change_top_bar(user, color).await
    }

    // ---- posts -------------------------------------------------------------

    /// Creates the post and casts the author's own upvote. No karma moves.
    #[instrument(skip_all, fields(author = ?session.principal()))]
    pub async fn create_post(&self, session: &Session, draft: PostDraft) -> Result<Post> {
        let author = session.require_principal()?;
        let post = self.posts.create(author, draft).await?;
        self.post_votes.upvote(author, post.id).await?;
        Ok(post)
    }

    pub async fn edit_post(&self, session: &Session, id: ItemId, draft: PostDraft) -> Result<Post> {
        let editor = session.require_principal()?;
        self.posts.update(id, editor, draft).await
    }

    /// Deletes a post that has no comments, within the author's edit window.
    #[instrument(skip_all, fields(post = %id))]
    pub async fn delete_post(&self, session: &Session, id: ItemId) -> Result<()> {
        let editor = session.require_principal()?;
        if !self.comments.get_by_parent(id).await?.is_empty() {
            return Err(AppError::not_allowed(
                "cannot delete a post that has comments",
            ));
        }
        self.posts.delete(id, editor).await
    }

    /// `Up` credits the post author one karma; `Unvote` of an upvote takes it
    /// back.
    #[instrument(skip_all, fields(post = %id, action = ?action))]
    pub async fn vote_post(&self, session: &Session, id: ItemId, action: PostVoteAction) -> Result<()> {
        let voter = session.require_principal()?;
        let post = self.posts.get_by_id(id).await?;
        if post.author == voter {
            return Err(AppError::not_allowed("cannot vote on your own post"));
        }

        match action {
            PostVoteAction::Up => {
                self.post_votes.upvote(voter, id).await?;
                self.karma.increase(post.author, 1).await?;
            }
            PostVoteAction::Unvote => {
                let removed = self
                    .post_votes
                    .unvote(voter, id)
                    .await?
                    .ok_or_else(|| AppError::not_found("post vote", id))?;
                if removed.kind == VoteType::Up {
                    self.take_karma(post.author).await?;
                }
            }
        }
        Ok(())
    }

    // ---- marks -------------------------------------------------------------

    pub async fn favorite_post(&self, session: &Session, id: ItemId) -> Result<MarkOutcome> {
        let user = session.require_principal()?;
        self.posts.get_by_id(id).await?;
        self.favorites.mark(user, id).await
    }

    pub async fn unfavorite_post(&self, session: &Session, id: ItemId) -> Result<()> {
        let user = session.require_principal()?;
        self.favorites.unmark(user, id).await
    }

    pub async fn hide_post(&self, session: &Session, id: ItemId) -> Result<MarkOutcome> {
        let user = session.require_principal()?;
        self.posts.get_by_id(id).await?;
        self.hides.mark(user, id).await
    }

    pub async fn unhide_post(&self, session: &Session, id: ItemId) -> Result<()> {
        let user = session.require_principal()?;
        self.hides.unmark(user, id).await
    }

    /// Flagging is gated on karma; the gate runs before anything else.
    #[instrument(skip_all, fields(post = %id))]
    pub async fn flag_post(&self, session: &Session, id: ItemId) -> Result<MarkOutcome> {
        let user = session.require_principal()?;
        self.karma.require_at_least(user, self.rules.flag_karma).await?;
        self.posts.get_by_id(id).await?;
        self.flags.mark(user, id).await
    }

    pub async fn unflag_post(&self, session: &Session, id: ItemId) -> Result<()> {
        let user = session.require_principal()?;
        self.flags.unmark(user, id).await
    }

    // ---- listings ----------------------------------------------------------

    pub async fn get_posts(&self, session: &Session, request: &FeedRequest) -> Result<Vec<PostView>> {
        self.feed.get_posts(session.principal(), request).await
    }

    pub async fn get_recent_posts(
        &self,
        session: &Session,
        request: &FeedRequest,
    ) -> Result<Vec<PostView>> {
        self.feed.get_recent_posts(session.principal(), request).await
    }

    pub async fn get_post_details(&self, session: &Session, id: ItemId) -> Result<PostDetails> {
        self.feed.get_post_details(session.principal(), id).await
    }

    /// The caller's favorites.
    pub async fn get_favorited_posts(&self, session: &Session) -> Result<Vec<PostView>> {
        let user = session.require_principal()?;
        self.feed.get_favorited_posts(user, Some(user)).await
    }

    /// Someone else's favorites, personalised for the caller if logged in.
    pub async fn get_favorited_posts_of(
        &self,
        session: &Session,
        username: &str,
    ) -> Result<Vec<PostView>> {
        let owner = self.users.get_by_username(username).await?;
        self.feed
            .get_favorited_posts(owner.id, session.principal())
            .await
    }

    pub async fn get_hidden_posts(&self, session: &Session) -> Result<Vec<PostView>> {
        let user = session.require_principal()?;
        self.feed.get_hidden_posts(user).await
    }

    // ---- comments ----------------------------------------------------------

    /// Creates the comment and casts the author's own upvote. No karma moves.
    #[instrument(skip_all, fields(parent = %parent))]
    pub async fn create_comment(
        &self,
        session: &Session,
        content: &str,
        parent: ItemId,
    ) -> Result<Comment> {
        let author = session.require_principal()?;
        if content.trim().is_empty() {
            return Err(AppError::bad_values("comment content must be non-empty"));
        }
        // A parent that is not a comment has to be a live post.
        match self.comments.get_by_id(parent).await {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.posts.get_by_id(parent).await?;
            }
            Err(err) => return Err(err),
        }
        let comment = self.comments.create(author, content, parent).await?;
        self.comment_votes.upvote(author, comment.id).await?;
        Ok(comment)
    }

    pub async fn comment_details(&self, session: &Session, id: ItemId) -> Result<CommentDetails> {
        let comment = self.comments.get_by_id(id).await?;
        let author = [comment.author];
        let (mut profiles, vote) = tokio::try_join!(
            self.users.profiles(&author),
            async {
                match session.principal() {
                    Some(viewer) => self.comment_votes.get_vote(viewer, id).await,
                    None => Ok(None),
                }
            },
        )?;
        Ok(CommentDetails {
            author_profile: profiles.remove(&comment.author),
            vote: vote.map(|v| v.kind),
            comment,
        })
    }

    pub async fn edit_comment(&self, session: &Session, id: ItemId, content: &str) -> Result<Comment> {
        let user = session.require_principal()?;
        if !self.comments.is_author(id, user).await? {
            return Err(AppError::not_allowed("only the author can edit a comment"));
        }
        self.comments.update(id, content).await
    }

    pub async fn delete_comment(&self, session: &Session, id: ItemId) -> Result<()> {
        let user = session.require_principal()?;
        if !self.comments.is_author(id, user).await? {
            return Err(AppError::not_allowed("only the author can delete a comment"));
        }
        self.comments.delete(id).await
    }

    /// Up and down votes move the comment author's karma by one. `Unvote`
    /// leaves karma as it is.
    #[instrument(skip_all, fields(comment = %id, action = ?action))]
    pub async fn vote_comment(
        &self,
        session: &Session,
        id: ItemId,
        action: CommentVoteAction,
    ) -> Result<()> {
        let voter = session.require_principal()?;
        let comment = self.comments.get_by_id(id).await?;
        if comment.author == voter {
            return Err(AppError::not_allowed("cannot vote on your own comment"));
        }

        match action {
            CommentVoteAction::Upvote => {
                self.comment_votes.upvote(voter, id).await?;
                self.karma.increase(comment.author, 1).await?;
            }
            CommentVoteAction::Downvote => {
                self.karma
                    .require_at_least(voter, self.rules.comment_downvote_karma)
                    .await?;
                self.comment_votes.downvote(voter, id).await?;
                self.take_karma(comment.author).await?;
            }
            CommentVoteAction::Unvote => {
                self.comment_votes.unvote(voter, id).await?;
            }
        }
        Ok(())
    }

    pub async fn comment_thread(&self, post: ItemId) -> Result<CommentThread> {
        self.posts.get_by_id(post).await?;
        self.comments.thread(post).await
    }

    pub async fn karma_of(&self, user: UserId) -> Result<u64> {
        self.karma.get(user).await
    }

    /// One point off `user` as the side effect of another user's vote. The
    /// floor wins: a user already at zero stays there and the vote stands.
    async fn take_karma(&self, user: UserId) -> Result<()> {
        match self.karma.decrease(user, 1).await {
            Ok(_) => Ok(()),
            Err(AppError::NotAllowed(reason)) => {
                warn!(%user, %reason, "karma already at floor; decrease skipped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
