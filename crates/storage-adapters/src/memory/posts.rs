use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use domains::{ItemId, Post, PostFilter, PostRepository, UserId};

use super::poisoned;

#[derive(Debug, Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first; equal timestamps put the later insert first.
    fn newest_first(&self, keep: impl Fn(&Post) -> bool) -> anyhow::Result<Vec<Post>> {
        let posts = self.posts.read().map_err(poisoned)?;
        let mut found: Vec<Post> = posts.iter().rev().filter(|p| keep(*p)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: &Post) -> anyhow::Result<()> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        if posts.iter().any(|p| p.id == post.id) {
            anyhow::bail!("duplicate post id {}", post.id);
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Post>> {
        let posts = self.posts.read().map_err(poisoned)?;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_many(&self, ids: &[ItemId]) -> anyhow::Result<Vec<Post>> {
        let wanted: HashSet<&ItemId> = ids.iter().collect();
        let posts = self.posts.read().map_err(poisoned)?;
        Ok(posts
            .iter()
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn replace(&self, post: &Post) -> anyhow::Result<bool> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => {
                *slot = post.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ItemId) -> anyhow::Result<bool> {
        let mut posts = self.posts.write().map_err(poisoned)?;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() != before)
    }

    async fn find(&self, filter: &PostFilter) -> anyhow::Result<Vec<Post>> {
        self.newest_first(|p| filter.matches(p))
    }

    async fn by_author(&self, author: UserId) -> anyhow::Result<Vec<Post>> {
        self.newest_first(|p| p.author == author)
    }
}
