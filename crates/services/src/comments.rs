//! # CommentTree
//!
//! Threaded comment storage. `root` and `depth` are derived once on insert
//! from the parent lookup; deletion is leaf-only.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    AppError, Clock, Comment, CommentRepository, ItemId, LeafDeletion, Placement, Result, UserId,
};
use tracing::{debug, info};

use crate::thread::CommentThread;

pub struct CommentTree {
    repo: Arc<dyn CommentRepository>,
    clock: Arc<dyn Clock>,
}

impl CommentTree {
    pub fn new(repo: Arc<dyn CommentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Inserts a reply under `parent`, which may be a comment or a post.
    pub async fn create(&self, author: UserId, content: &str, parent: ItemId) -> Result<Comment> {
        let parent_comment = self.repo.get(parent).await?;
        let Placement { root, depth } = Placement::under(parent, parent_comment.as_ref());

        let now = self.clock.now();
        let comment = Comment {
            id: ItemId::new(),
            author,
            content: content.to_string(),
            parent,
            root,
            depth,
            created_at: now,
            updated_at: now,
        };
        if !self.repo.insert(&comment).await? {
            return Err(AppError::not_found("comment", parent));
        }
        debug!(comment = %comment.id, %root, depth, "comment created");
        Ok(comment)
    }

    pub async fn update(&self, id: ItemId, content: &str) -> Result<Comment> {
        self.repo
            .update_content(id, content, self.clock.now())
            .await?
            .ok_or_else(|| AppError::not_found("comment", id))
    }

    /// Removes a comment that has no replies.
    pub async fn delete(&self, id: ItemId) -> Result<()> {
        match self.repo.delete_leaf(id).await? {
            LeafDeletion::Deleted => {
                info!(comment = %id, "comment deleted");
                Ok(())
            }
            LeafDeletion::Missing => Err(AppError::not_found("comment", id)),
            LeafDeletion::HasReplies => Err(AppError::not_allowed(
                "cannot delete a comment that has replies",
            )),
        }
    }

    pub async fn get_by_id(&self, id: ItemId) -> Result<Comment> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("comment", id))
    }

    pub async fn get_by_author(&self, author: UserId) -> Result<Vec<Comment>> {
        Ok(self.repo.by_author(author).await?)
    }

    pub async fn is_author(&self, id: ItemId, user: UserId) -> Result<bool> {
        Ok(self.get_by_id(id).await?.author == user)
    }

    /// The whole subtree under `parent` (a post or a comment), flattened
    /// depth-first. Fetches the enclosing thread once instead of querying per
    /// level.
    pub async fn get_by_parent(&self, parent: ItemId) -> Result<Vec<Comment>> {
        let root = match self.repo.get(parent).await? {
            Some(c) => c.root,
            None => parent,
        };
        let thread = self.thread(root).await?;
        Ok(thread.descendants(parent).into_iter().cloned().collect())
    }

    /// Materialises every comment sharing `root`.
    pub async fn thread(&self, root: ItemId) -> Result<CommentThread> {
        let comments = self.repo.by_root(root).await?;
        Ok(CommentThread::new(root, comments))
    }

    /// Comment count per root; roots without comments map to 0.
    pub async fn count_by_roots(&self, roots: &[ItemId]) -> Result<HashMap<ItemId, usize>> {
        if roots.is_empty() {
            return Ok(HashMap::new());
        }
        let counts = self.repo.count_by_roots(roots).await?;
        Ok(roots
            .iter()
            .map(|r| (*r, counts.get(r).copied().unwrap_or(0)))
            .collect())
    }
}
