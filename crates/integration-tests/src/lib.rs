//! Shared fixture for the cross-crate tests: a `ForumService` over a given
//! set of repositories, driven by a clock the test controls.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use domains::{
    Clock, FixedClock, ForumRules, ItemId, Post, PostDraft, Repositories, Session, UserId,
};
use services::ForumService;

/// 2024-03-01 12:00:00 UTC.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub struct TestForum {
    pub forum: ForumService,
    pub clock: Arc<FixedClock>,
    pub repos: Repositories,
}

impl TestForum {
    /// In-memory repositories, clock at [`epoch`].
    pub fn new() -> Self {
        Self::with_repos(storage_adapters::memory::repositories())
    }

    pub fn with_repos(repos: Repositories) -> Self {
        Self::build(repos, ForumRules::default())
    }

    /// In-memory repositories under a custom rule set.
    pub fn with_rules(rules: ForumRules) -> Self {
        Self::build(storage_adapters::memory::repositories(), rules)
    }

    fn build(repos: Repositories, rules: ForumRules) -> Self {
        let clock = Arc::new(FixedClock::at(epoch()));
        let forum = ForumService::new(repos.clone(), clock.clone(), rules);
        Self { forum, clock, repos }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Registers `username` and returns a session for it.
    pub async fn user(&self, username: &str) -> Session {
        let user = self
            .forum
            .register(&Session::anonymous(), username)
            .await
            .expect("register fixture user");
        Session::for_user(user.profile.id)
    }

    pub fn id(session: &Session) -> UserId {
        session.principal().expect("fixture sessions are logged in")
    }

    /// Tops up karma without going through votes.
    pub async fn grant_karma(&self, session: &Session, points: u64) {
        self.repos
            .karma
            .add(Self::id(session), points)
            .await
            .expect("grant karma");
    }

    pub async fn karma(&self, session: &Session) -> u64 {
        self.forum
            .karma_of(Self::id(session))
            .await
            .expect("read karma")
    }

    pub async fn post(&self, author: &Session, title: &str) -> Post {
        self.forum
            .create_post(author, PostDraft::titled(title))
            .await
            .expect("create fixture post")
    }

    /// `count` fresh users, each upvoting `post` once.
    pub async fn upvote_with_crowd(&self, post: ItemId, count: usize) {
        for _ in 0..count {
            let voter = self.user(&format!("voter-{}", ItemId::new())).await;
            self.forum
                .vote_post(&voter, post, services::PostVoteAction::Up)
                .await
                .expect("crowd upvote");
        }
    }
}

impl Default for TestForum {
    fn default() -> Self {
        Self::new()
    }
}
