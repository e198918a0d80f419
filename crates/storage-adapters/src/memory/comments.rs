use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{Comment, CommentRepository, ItemId, LeafDeletion, UserId};

use super::poisoned;

/// Comments in insertion order. The parent check in `insert` and the
/// children check in `delete_leaf` each run under the write lock they mutate
/// with.
#[derive(Debug, Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<Vec<Comment>>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, keep: impl Fn(&Comment) -> bool) -> anyhow::Result<Vec<Comment>> {
        let comments = self.comments.read().map_err(poisoned)?;
        Ok(comments.iter().filter(|c| keep(*c)).cloned().collect())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn insert(&self, comment: &Comment) -> anyhow::Result<bool> {
        let mut comments = self.comments.write().map_err(poisoned)?;
        if comments.iter().any(|c| c.id == comment.id) {
            anyhow::bail!("duplicate comment id {}", comment.id);
        }
        if comment.depth > 0 && !comments.iter().any(|c| c.id == comment.parent) {
            return Ok(false);
        }
        comments.push(comment.clone());
        Ok(true)
    }

    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Comment>> {
        let comments = self.comments.read().map_err(poisoned)?;
        Ok(comments.iter().find(|c| c.id == id).cloned())
    }

    async fn update_content(
        &self,
        id: ItemId,
        content: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Comment>> {
        let mut comments = self.comments.write().map_err(poisoned)?;
        Ok(comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.content = content.to_string();
            c.updated_at = at;
            c.clone()
        }))
    }

    async fn delete_leaf(&self, id: ItemId) -> anyhow::Result<LeafDeletion> {
        let mut comments = self.comments.write().map_err(poisoned)?;
        let Some(pos) = comments.iter().position(|c| c.id == id) else {
            return Ok(LeafDeletion::Missing);
        };
        if comments.iter().any(|c| c.parent == id) {
            return Ok(LeafDeletion::HasReplies);
        }
        comments.remove(pos);
        Ok(LeafDeletion::Deleted)
    }

    async fn by_root(&self, root: ItemId) -> anyhow::Result<Vec<Comment>> {
        self.select(|c| c.root == root)
    }

    async fn by_author(&self, author: UserId) -> anyhow::Result<Vec<Comment>> {
        self.select(|c| c.author == author)
    }

    async fn count_by_roots(&self, roots: &[ItemId]) -> anyhow::Result<HashMap<ItemId, usize>> {
        let wanted: HashSet<&ItemId> = roots.iter().collect();
        let comments = self.comments.read().map_err(poisoned)?;
        let mut counts = HashMap::new();
        for c in comments.iter().filter(|c| wanted.contains(&c.root)) {
            *counts.entry(c.root).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(parent: ItemId, root: ItemId, depth: u32) -> Comment {
        let now = Utc::now();
        Comment {
            id: ItemId::new(),
            author: UserId::new(),
            content: "text".into(),
            parent,
            root,
            depth,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn leaf_deletion_refuses_parents() {
        let repo = InMemoryCommentRepository::new();
        let post = ItemId::new();
        let top = comment(post, post, 0);
        let reply = comment(top.id, post, 1);
        repo.insert(&top).await.unwrap();
        repo.insert(&reply).await.unwrap();

        assert_eq!(repo.delete_leaf(top.id).await.unwrap(), LeafDeletion::HasReplies);
        assert_eq!(repo.delete_leaf(reply.id).await.unwrap(), LeafDeletion::Deleted);
        assert_eq!(repo.delete_leaf(top.id).await.unwrap(), LeafDeletion::Deleted);
        assert_eq!(repo.delete_leaf(top.id).await.unwrap(), LeafDeletion::Missing);
    }

    #[tokio::test]
    async fn replies_to_deleted_comments_are_refused() {
        let repo = InMemoryCommentRepository::new();
        let post = ItemId::new();
        let top = comment(post, post, 0);
        assert!(repo.insert(&top).await.unwrap());
        assert_eq!(repo.delete_leaf(top.id).await.unwrap(), LeafDeletion::Deleted);

        let late = comment(top.id, post, 1);
        assert!(!repo.insert(&late).await.unwrap());
        assert!(repo.get(late.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_cover_whole_threads() {
        let repo = InMemoryCommentRepository::new();
        let (a, b) = (ItemId::new(), ItemId::new());
        let top = comment(a, a, 0);
        repo.insert(&top).await.unwrap();
        repo.insert(&comment(top.id, a, 1)).await.unwrap();
        repo.insert(&comment(b, b, 0)).await.unwrap();

        let counts = repo.count_by_roots(&[a, b, ItemId::new()]).await.unwrap();
        assert_eq!(counts.get(&a), Some(&2));
        assert_eq!(counts.get(&b), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
