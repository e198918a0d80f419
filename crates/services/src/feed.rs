//! # FeedRanker
//!
//! Assembles ranked, filtered, paginated and viewer-personalised post lists.
//! It only reads from the leaf components; every view it builds is derived
//! on the fly and never stored.
//!
//! # Developer Note
//! The per-page lookups (profiles, points, comment counts, flags, the
//! viewer's hides and votes) are independent, so they are polled
//! concurrently with `tokio::try_join!` and joined before scoring. This is
//! the latency-sensitive path of the whole service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use domains::{
    AppError, Clock, ForumRules, ItemId, Mark, Post, PostDetails, PostFilter, PostView, Result,
    UserId, UserProfile, Vote,
};
use serde::Deserialize;

use crate::comments::CommentTree;
use crate::marks::MarkStore;
use crate::posts::PostStore;
use crate::users::UserDirectory;
use crate::votes::VoteLedger;

/// Ranking score of one post:
/// `(points − 1) / max(age_hours, 1)^decay − penalty × flags`.
///
/// The `− 1` belongs to the numerator, so a post carrying only its author's
/// own upvote scores zero before flags.
pub fn rank_score(points: i64, flags: usize, age: Duration, rules: &ForumRules) -> f64 {
    let hours = (age.num_milliseconds() as f64 / 3_600_000.0).max(1.0);
    (points - 1) as f64 / hours.powf(rules.decay_exponent) - rules.flag_penalty * flags as f64
}

/// A 1-based page of `size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn new(number: usize, size: usize) -> Result<Self> {
        if number == 0 || size == 0 {
            return Err(AppError::bad_values("page and count must be at least 1"));
        }
        Ok(Self { number, size })
    }

    pub fn offset(&self) -> usize {
        (self.number - 1).saturating_mul(self.size)
    }

    /// Rows of this page paired with their global 1-based index.
    pub fn window<T>(&self, items: Vec<T>) -> impl Iterator<Item = (usize, T)> {
        items
            .into_iter()
            .enumerate()
            .skip(self.offset())
            .take(self.size)
            .map(|(i, item)| (i + 1, item))
    }
}

/// Listing parameters as they arrive from the request layer. Missing or zero
/// `page`/`count` fall back to the first page of the default size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedRequest {
    pub page: Option<usize>,
    pub count: Option<usize>,
    #[serde(rename = "prefix")]
    pub title_prefix: Option<String>,
    /// Restricts the listing to one UTC day.
    pub date: Option<NaiveDate>,
}

impl FeedRequest {
    pub fn page(number: usize, count: usize) -> Self {
        Self {
            page: Some(number),
            count: Some(count),
            ..Default::default()
        }
    }
}

/// The leaf components the ranker reads from.
pub struct FeedSources {
    pub posts: Arc<PostStore>,
    pub votes: Arc<VoteLedger>,
    pub comments: Arc<CommentTree>,
    pub users: Arc<UserDirectory>,
    pub flags: Arc<MarkStore>,
    pub hides: Arc<MarkStore>,
    pub favorites: Arc<MarkStore>,
}

pub struct FeedRanker {
    src: FeedSources,
    clock: Arc<dyn Clock>,
    rules: ForumRules,
}

/// Per-page lookups joined before scoring.
struct Enrichment {
    profiles: HashMap<UserId, UserProfile>,
    points: HashMap<ItemId, i64>,
    comments: HashMap<ItemId, usize>,
    flags: HashMap<ItemId, usize>,
    hidden: HashSet<ItemId>,
    votes: HashMap<ItemId, Vote>,
}

impl FeedRanker {
    pub fn new(src: FeedSources, clock: Arc<dyn Clock>, rules: ForumRules) -> Self {
        Self { src, clock, rules }
    }

    /// The front page: candidates from the feed window (or the requested
    /// day), hidden posts removed, ordered by [`rank_score`].
    pub async fn get_posts(
        &self,
        viewer: Option<UserId>,
        request: &FeedRequest,
    ) -> Result<Vec<PostView>> {
        let now = self.clock.now();
        let page = self.resolve_page(request)?;
        let from = self
            .rules
            .feed_window()
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "feed window of {} days is out of range",
                    self.rules.feed_window_days
                ))
            })?;
        let filter = self.filter(request, Some(from));

        let candidates = self.src.posts.find(&filter).await?;
        let e = self.enrich(&candidates, viewer).await?;

        let mut scored: Vec<(f64, Post)> = candidates
            .into_iter()
            .filter(|p| !e.hidden.contains(&p.id))
            .map(|p| {
                let points = e.points.get(&p.id).copied().unwrap_or(0);
                let flags = e.flags.get(&p.id).copied().unwrap_or(0);
                (rank_score(points, flags, now - p.created_at, &self.rules), p)
            })
            .collect();
        // Stable: equal scores keep the store's newest-first order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(page
            .window(scored)
            .map(|(index, (_, post))| self.row(index, post, &e))
            .collect())
    }

    /// Newest first, same filters and row shape as [`Self::get_posts`], but
    /// no default time window and no scoring.
    pub async fn get_recent_posts(
        &self,
        viewer: Option<UserId>,
        request: &FeedRequest,
    ) -> Result<Vec<PostView>> {
        let page = self.resolve_page(request)?;
        let filter = self.filter(request, None);

        let candidates = self.src.posts.find(&filter).await?;
        let e = self.enrich(&candidates, viewer).await?;
        let visible: Vec<Post> = candidates
            .into_iter()
            .filter(|p| !e.hidden.contains(&p.id))
            .collect();

        Ok(page
            .window(visible)
            .map(|(index, post)| self.row(index, post, &e))
            .collect())
    }

    pub async fn get_post_details(&self, viewer: Option<UserId>, id: ItemId) -> Result<PostDetails> {
        let post = self.src.posts.get_by_id(id).await?;
        let author = [post.author];
        let root = [id];

        let (mut profiles, points, comments, vote, hidden, favorited, flagged) = tokio::try_join!(
            self.src.users.profiles(&author),
            self.src.votes.points_for(id),
            self.src.comments.count_by_roots(&root),
            async {
                match viewer {
                    Some(v) => self.src.votes.get_vote(v, id).await,
                    None => Ok(None),
                }
            },
            marked_by(&self.src.hides, viewer, id),
            marked_by(&self.src.favorites, viewer, id),
            marked_by(&self.src.flags, viewer, id),
        )?;

        Ok(PostDetails {
            author_profile: profiles.remove(&post.author),
            points,
            comments: comments.get(&id).copied().unwrap_or(0),
            vote: vote.map(|v| v.kind),
            hidden,
            favorited,
            flagged,
            post,
        })
    }

    /// Posts `owner` favorited, in the order they were favorited, enriched
    /// for `viewer`.
    pub async fn get_favorited_posts(
        &self,
        owner: UserId,
        viewer: Option<UserId>,
    ) -> Result<Vec<PostView>> {
        let marks = self.src.favorites.get_by_user(owner).await?;
        self.marked_listing(marks, viewer).await
    }

    /// Posts the viewer hid; every row carries `hidden: true`.
    pub async fn get_hidden_posts(&self, viewer: UserId) -> Result<Vec<PostView>> {
        let marks = self.src.hides.get_by_user(viewer).await?;
        self.marked_listing(marks, Some(viewer)).await
    }

    async fn marked_listing(&self, marks: Vec<Mark>, viewer: Option<UserId>) -> Result<Vec<PostView>> {
        let ids: Vec<ItemId> = marks.iter().map(|m| m.item).collect();
        let mut by_id = self.src.posts.get_by_ids(&ids).await?;
        // Marks can outlive their post; those are skipped.
        let posts: Vec<Post> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        let e = self.enrich(&posts, viewer).await?;
        Ok(posts
            .into_iter()
            .enumerate()
            .map(|(i, post)| self.row(i + 1, post, &e))
            .collect())
    }

    async fn enrich(&self, posts: &[Post], viewer: Option<UserId>) -> Result<Enrichment> {
        let ids: Vec<ItemId> = posts.iter().map(|p| p.id).collect();
        let authors: Vec<UserId> = posts.iter().map(|p| p.author).collect();

        let (profiles, points, comments, flags, hidden, votes) = tokio::try_join!(
            self.src.users.profiles(&authors),
            self.src.votes.points_for_many(&ids),
            self.src.comments.count_by_roots(&ids),
            self.src.flags.count_by_items(&ids),
            async {
                match viewer {
                    Some(v) => self
                        .src
                        .hides
                        .get_by_user(v)
                        .await
                        .map(|marks| marks.into_iter().map(|m| m.item).collect::<HashSet<_>>()),
                    None => Ok(HashSet::new()),
                }
            },
            async {
                match viewer {
                    Some(v) => self.src.votes.get_votes(v, Some(ids.as_slice())).await,
                    None => Ok(HashMap::new()),
                }
            },
        )?;

        Ok(Enrichment {
            profiles,
            points,
            comments,
            flags,
            hidden,
            votes,
        })
    }

    fn row(&self, index: usize, post: Post, e: &Enrichment) -> PostView {
        PostView {
            index,
            author_profile: e.profiles.get(&post.author).cloned(),
            points: e.points.get(&post.id).copied().unwrap_or(0),
            comments: e.comments.get(&post.id).copied().unwrap_or(0),
            vote: e.votes.get(&post.id).map(|v| v.kind),
            hidden: e.hidden.contains(&post.id),
            post,
        }
    }

    fn resolve_page(&self, request: &FeedRequest) -> Result<Page> {
        let number = request.page.filter(|n| *n > 0).unwrap_or(1);
        let size = request
            .count
            .filter(|n| *n > 0)
            .unwrap_or(self.rules.default_page_size);
        Page::new(number, size)
    }

    fn filter(
        &self,
        request: &FeedRequest,
        default_from: Option<chrono::DateTime<Utc>>,
    ) -> PostFilter {
        let title_prefix = request
            .title_prefix
            .as_ref()
            .filter(|p| !p.is_empty())
            .cloned();
        match request.date {
            Some(day) => {
                let start = day.and_time(NaiveTime::MIN).and_utc();
                PostFilter {
                    created_from: Some(start),
                    created_until: Some(start + Duration::days(1) - Duration::milliseconds(1)),
                    title_prefix,
                }
            }
            None => PostFilter {
                created_from: default_from,
                created_until: None,
                title_prefix,
            },
        }
    }
}

async fn marked_by(store: &MarkStore, viewer: Option<UserId>, item: ItemId) -> Result<bool> {
    match viewer {
        Some(v) => store.is_marked(v, item).await,
        None => Ok(false),
    }
}
