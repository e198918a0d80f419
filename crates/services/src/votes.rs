//! # VoteLedger
//!
//! At most one vote per (voter, item), and point totals derived from them.
//! The ledger never touches karma; the action flows in [`crate::forum`] do.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    AppError, Clock, ItemId, Result, UserId, Vote, VoteRepository, VoteTarget, VoteType,
};
use tracing::debug;

pub struct VoteLedger {
    target: VoteTarget,
    repo: Arc<dyn VoteRepository>,
    clock: Arc<dyn Clock>,
}

impl VoteLedger {
    pub fn new(target: VoteTarget, repo: Arc<dyn VoteRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { target, repo, clock }
    }

    pub fn target(&self) -> VoteTarget {
        self.target
    }

    pub async fn upvote(&self, author: UserId, item: ItemId) -> Result<Vote> {
        self.cast(author, item, VoteType::Up).await
    }

    pub async fn downvote(&self, author: UserId, item: ItemId) -> Result<Vote> {
        self.cast(author, item, VoteType::Down).await
    }

    async fn cast(&self, author: UserId, item: ItemId, kind: VoteType) -> Result<Vote> {
        let vote = Vote {
            author,
            item,
            kind,
            created_at: self.clock.now(),
        };
        // The store decides uniqueness; a separate read here would race.
        if !self.repo.insert_if_absent(self.target, &vote).await? {
            return Err(AppError::not_allowed(
                "user already voted on this item; unvote to change the vote",
            ));
        }
        debug!(ledger = self.target.as_str(), %author, %item, kind = kind.as_str(), "vote cast");
        Ok(vote)
    }

    /// Removes the vote if present and returns it. Absent votes are a no-op.
    pub async fn unvote(&self, author: UserId, item: ItemId) -> Result<Option<Vote>> {
        let removed = self.repo.remove(self.target, author, item).await?;
        if removed.is_some() {
            debug!(ledger = self.target.as_str(), %author, %item, "vote removed");
        }
        Ok(removed)
    }

    pub async fn get_vote(&self, author: UserId, item: ItemId) -> Result<Option<Vote>> {
        Ok(self.repo.find(self.target, author, item).await?)
    }

    /// Votes by `author`, keyed by item. `items` restricts the lookup to a
    /// page of items; an empty restriction yields an empty map.
    pub async fn get_votes(
        &self,
        author: UserId,
        items: Option<&[ItemId]>,
    ) -> Result<HashMap<ItemId, Vote>> {
        let votes = match items {
            Some([]) => Vec::new(),
            Some(items) => self.repo.find_for_items(self.target, author, items).await?,
            None => self.repo.find_by_author(self.target, author).await?,
        };
        Ok(votes.into_iter().map(|v| (v.item, v)).collect())
    }

    /// Every upvote `author` has cast, oldest first.
    pub async fn upvoted_by(&self, author: UserId) -> Result<Vec<Vote>> {
        let votes = self.repo.find_by_author(self.target, author).await?;
        Ok(votes.into_iter().filter(|v| v.kind == VoteType::Up).collect())
    }

    /// #upvotes − #downvotes.
    pub async fn points_for(&self, item: ItemId) -> Result<i64> {
        Ok(self.repo.tally(self.target, item).await?.points())
    }

    /// Points for every requested item; unvoted items map to 0.
    pub async fn points_for_many(&self, items: &[ItemId]) -> Result<HashMap<ItemId, i64>> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        let tallies = self.repo.tallies(self.target, items).await?;
        Ok(items
            .iter()
            .map(|id| (*id, tallies.get(id).map(|t| t.points()).unwrap_or(0)))
            .collect())
    }
}
