//! # PostStore
//!
//! Post records. Only the author may edit or delete, and only inside the
//! edit window measured from `created_at`.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    AppError, Clock, ForumRules, ItemId, Post, PostDraft, PostFilter, PostRepository, Result,
    UserId,
};
use tracing::info;

pub struct PostStore {
    repo: Arc<dyn PostRepository>,
    clock: Arc<dyn Clock>,
    rules: ForumRules,
}

impl PostStore {
    pub fn new(repo: Arc<dyn PostRepository>, clock: Arc<dyn Clock>, rules: ForumRules) -> Self {
        Self { repo, clock, rules }
    }

    pub async fn create(&self, author: UserId, draft: PostDraft) -> Result<Post> {
        validate(&draft)?;
        let post = Post {
            id: ItemId::new(),
            author,
            title: draft.title,
            url: draft.url,
            text: draft.text,
            created_at: self.clock.now(),
        };
        self.repo.insert(&post).await?;
        info!(post = %post.id, %author, "post created");
        Ok(post)
    }

    /// Replaces title/url/text; author and `created_at` are preserved.
    pub async fn update(&self, id: ItemId, editor: UserId, draft: PostDraft) -> Result<Post> {
        validate(&draft)?;
        let existing = self.editable(id, editor, "updated").await?;
        let post = Post {
            title: draft.title,
            url: draft.url,
            text: draft.text,
            ..existing
        };
        if !self.repo.replace(&post).await? {
            return Err(AppError::not_found("post", id));
        }
        Ok(post)
    }

    pub async fn delete(&self, id: ItemId, editor: UserId) -> Result<()> {
        self.editable(id, editor, "deleted").await?;
        if !self.repo.delete(id).await? {
            return Err(AppError::not_found("post", id));
        }
        info!(post = %id, "post deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: ItemId) -> Result<Post> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("post", id))
    }

    pub async fn get_by_ids(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, Post>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let posts = self.repo.get_many(ids).await?;
        Ok(posts.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Newest first.
    pub async fn get_by_author(&self, author: UserId) -> Result<Vec<Post>> {
        Ok(self.repo.by_author(author).await?)
    }

    /// Candidates for a listing, newest first.
    pub async fn find(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        Ok(self.repo.find(filter).await?)
    }

    pub async fn is_author(&self, id: ItemId, user: UserId) -> Result<bool> {
        Ok(self.get_by_id(id).await?.author == user)
    }

    async fn editable(&self, id: ItemId, editor: UserId, verb: &str) -> Result<Post> {
        let post = self.get_by_id(id).await?;
        let window = self.rules.edit_window().ok_or_else(|| {
            AppError::Internal(format!(
                "edit window of {} minutes is out of range",
                self.rules.edit_window_minutes
            ))
        })?;
        if !post.within_window(self.clock.now(), window) {
            return Err(AppError::not_allowed(format!(
                "posts can only be {verb} within {} minutes of creation",
                self.rules.edit_window_minutes
            )));
        }
        if post.author != editor {
            return Err(AppError::not_allowed(format!(
                "only the author can have the post {verb}"
            )));
        }
        Ok(post)
    }
}

fn validate(draft: &PostDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(AppError::bad_values("title is required"));
    }
    Ok(())
}
