//! # MarkStore
//!
//! One generic per-(user, item) tag component. The forum runs three
//! instances (favorite, hide, flag) that differ only in their namespace, so
//! they can never see each other's marks.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{AppError, Clock, ItemId, Mark, MarkNamespace, MarkRepository, Result, UserId};
use serde::Serialize;
use tracing::debug;

/// What `mark` did. Re-marking is reported, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    Marked,
    AlreadyMarked,
}

pub struct MarkStore {
    namespace: MarkNamespace,
    repo: Arc<dyn MarkRepository>,
    clock: Arc<dyn Clock>,
}

impl MarkStore {
    pub fn new(
        namespace: MarkNamespace,
        repo: Arc<dyn MarkRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            namespace,
            repo,
            clock,
        }
    }

    pub fn namespace(&self) -> MarkNamespace {
        self.namespace
    }

    pub async fn mark(&self, user: UserId, item: ItemId) -> Result<MarkOutcome> {
        let mark = Mark {
            user,
            item,
            created_at: self.clock.now(),
        };
        if self.repo.insert_if_absent(self.namespace, &mark).await? {
            debug!(namespace = self.namespace.as_str(), %user, %item, "item marked");
            Ok(MarkOutcome::Marked)
        } else {
            Ok(MarkOutcome::AlreadyMarked)
        }
    }

    pub async fn unmark(&self, user: UserId, item: ItemId) -> Result<()> {
        if !self.repo.remove(self.namespace, user, item).await? {
            return Err(AppError::not_found(
                format!("{} mark", self.namespace.as_str()),
                item,
            ));
        }
        debug!(namespace = self.namespace.as_str(), %user, %item, "item unmarked");
        Ok(())
    }

    pub async fn is_marked(&self, user: UserId, item: ItemId) -> Result<bool> {
        Ok(self.repo.exists(self.namespace, user, item).await?)
    }

    /// Oldest mark first.
    pub async fn get_by_user(&self, user: UserId) -> Result<Vec<Mark>> {
        Ok(self.repo.by_user(self.namespace, user).await?)
    }

    pub async fn get_by_item(&self, item: ItemId) -> Result<Vec<Mark>> {
        Ok(self.repo.by_item(self.namespace, item).await?)
    }

    pub async fn get_by_items(&self, items: &[ItemId]) -> Result<Vec<Mark>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.repo.by_items(self.namespace, items).await?)
    }

    /// Number of marks per item; unmarked items are absent.
    pub async fn count_by_items(&self, items: &[ItemId]) -> Result<HashMap<ItemId, usize>> {
        let mut counts = HashMap::new();
        for mark in self.get_by_items(items).await? {
            *counts.entry(mark.item).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
