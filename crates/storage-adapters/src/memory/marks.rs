use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{ItemId, Mark, MarkNamespace, MarkRepository, UserId};

use super::Sequence;

type Key = (MarkNamespace, UserId, ItemId);

/// All three mark-sets in one map; the namespace is part of the key.
#[derive(Debug, Default)]
pub struct InMemoryMarkRepository {
    marks: DashMap<Key, (u64, Mark)>,
    seq: Sequence,
}

impl InMemoryMarkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, keep: impl Fn(&Key) -> bool) -> Vec<Mark> {
        let mut found: Vec<(u64, Mark)> = self
            .marks
            .iter()
            .filter(|e| keep(e.key()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, m)| m).collect()
    }
}

#[async_trait]
impl MarkRepository for InMemoryMarkRepository {
    async fn insert_if_absent(&self, namespace: MarkNamespace, mark: &Mark) -> anyhow::Result<bool> {
        match self.marks.entry((namespace, mark.user, mark.item)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert((self.seq.next(), mark.clone()));
                Ok(true)
            }
        }
    }

    async fn remove(
        &self,
        namespace: MarkNamespace,
        user: UserId,
        item: ItemId,
    ) -> anyhow::Result<bool> {
        Ok(self.marks.remove(&(namespace, user, item)).is_some())
    }

    async fn exists(
        &self,
        namespace: MarkNamespace,
        user: UserId,
        item: ItemId,
    ) -> anyhow::Result<bool> {
        Ok(self.marks.contains_key(&(namespace, user, item)))
    }

    async fn by_user(&self, namespace: MarkNamespace, user: UserId) -> anyhow::Result<Vec<Mark>> {
        Ok(self.collect_sorted(|(ns, u, _)| *ns == namespace && *u == user))
    }

    async fn by_item(&self, namespace: MarkNamespace, item: ItemId) -> anyhow::Result<Vec<Mark>> {
        Ok(self.collect_sorted(|(ns, _, i)| *ns == namespace && *i == item))
    }

    async fn by_items(
        &self,
        namespace: MarkNamespace,
        items: &[ItemId],
    ) -> anyhow::Result<Vec<Mark>> {
        let items: HashSet<&ItemId> = items.iter().collect();
        Ok(self.collect_sorted(|(ns, _, i)| *ns == namespace && items.contains(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mark(user: UserId, item: ItemId) -> Mark {
        Mark {
            user,
            item,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn namespaces_do_not_share_marks() {
        let repo = InMemoryMarkRepository::new();
        let (user, item) = (UserId::new(), ItemId::new());
        assert!(repo
            .insert_if_absent(MarkNamespace::Hide, &mark(user, item))
            .await
            .unwrap());
        assert!(!repo
            .exists(MarkNamespace::Flag, user, item)
            .await
            .unwrap());
        assert!(!repo
            .insert_if_absent(MarkNamespace::Hide, &mark(user, item))
            .await
            .unwrap());
        assert!(repo
            .insert_if_absent(MarkNamespace::Favorite, &mark(user, item))
            .await
            .unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_marks_keep_one() {
        let repo = std::sync::Arc::new(InMemoryMarkRepository::new());
        let (user, item) = (UserId::new(), ItemId::new());
        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert_if_absent(MarkNamespace::Favorite, &mark(user, item))
                        .await
                })
            })
            .collect();
        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(
            repo.by_item(MarkNamespace::Favorite, item).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn remove_reports_absence() {
        let repo = InMemoryMarkRepository::new();
        let (user, item) = (UserId::new(), ItemId::new());
        assert!(!repo.remove(MarkNamespace::Flag, user, item).await.unwrap());
        repo.insert_if_absent(MarkNamespace::Flag, &mark(user, item))
            .await
            .unwrap();
        assert!(repo.remove(MarkNamespace::Flag, user, item).await.unwrap());
    }
}
