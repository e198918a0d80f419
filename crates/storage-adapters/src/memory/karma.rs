use async_trait::async_trait;
use dashmap::DashMap;
use domains::{KarmaDecrement, KarmaRepository, UserId};

#[derive(Debug, Default)]
pub struct InMemoryKarmaRepository {
    points: DashMap<UserId, u64>,
}

impl InMemoryKarmaRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KarmaRepository for InMemoryKarmaRepository {
    async fn points(&self, user: UserId) -> anyhow::Result<Option<u64>> {
        Ok(self.points.get(&user).map(|p| *p))
    }

    async fn add(&self, user: UserId, n: u64) -> anyhow::Result<u64> {
        let mut points = self.points.entry(user).or_insert(0);
        *points = points.saturating_add(n);
        Ok(*points)
    }

    async fn subtract(&self, user: UserId, n: u64) -> anyhow::Result<KarmaDecrement> {
        // get_mut holds the shard write lock across the check and the write.
        let Some(mut points) = self.points.get_mut(&user) else {
            return Ok(KarmaDecrement::Missing);
        };
        if *points < n {
            return Ok(KarmaDecrement::Insufficient(*points));
        }
        *points -= n;
        Ok(KarmaDecrement::Applied(*points))
    }
}
