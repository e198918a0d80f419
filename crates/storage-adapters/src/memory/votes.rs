use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{ItemId, Tally, UserId, Vote, VoteRepository, VoteTarget, VoteType};

use super::Sequence;

type Key = (VoteTarget, UserId, ItemId);

/// Both vote ledgers in one map; the target is part of the key.
#[derive(Debug, Default)]
pub struct InMemoryVoteRepository {
    votes: DashMap<Key, (u64, Vote)>,
    seq: Sequence,
}

impl InMemoryVoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, keep: impl Fn(&Key) -> bool) -> Vec<Vote> {
        let mut found: Vec<(u64, Vote)> = self
            .votes
            .iter()
            .filter(|e| keep(e.key()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, v)| v).collect()
    }
}

#[async_trait]
impl VoteRepository for InMemoryVoteRepository {
    async fn insert_if_absent(&self, target: VoteTarget, vote: &Vote) -> anyhow::Result<bool> {
        match self.votes.entry((target, vote.author, vote.item)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert((self.seq.next(), vote.clone()));
                Ok(true)
            }
        }
    }

    async fn remove(
        &self,
        target: VoteTarget,
        author: UserId,
        item: ItemId,
    ) -> anyhow::Result<Option<Vote>> {
        Ok(self
            .votes
            .remove(&(target, author, item))
            .map(|(_, (_, vote))| vote))
    }

    async fn find(
        &self,
        target: VoteTarget,
        author: UserId,
        item: ItemId,
    ) -> anyhow::Result<Option<Vote>> {
        Ok(self
            .votes
            .get(&(target, author, item))
            .map(|e| e.value().1.clone()))
    }

    async fn find_by_author(
        &self,
        target: VoteTarget,
        author: UserId,
    ) -> anyhow::Result<Vec<Vote>> {
        Ok(self.collect_sorted(|(t, a, _)| *t == target && *a == author))
    }

    async fn find_for_items(
        &self,
        target: VoteTarget,
        author: UserId,
        items: &[ItemId],
    ) -> anyhow::Result<Vec<Vote>> {
        let items: HashSet<&ItemId> = items.iter().collect();
        Ok(self.collect_sorted(|(t, a, i)| *t == target && *a == author && items.contains(i)))
    }

    async fn tally(&self, target: VoteTarget, item: ItemId) -> anyhow::Result<Tally> {
        let mut tally = Tally::default();
        for e in self.votes.iter() {
            let (t, _, i) = e.key();
            if *t == target && *i == item {
                count(&mut tally, e.value().1.kind);
            }
        }
        Ok(tally)
    }

    async fn tallies(
        &self,
        target: VoteTarget,
        items: &[ItemId],
    ) -> anyhow::Result<HashMap<ItemId, Tally>> {
        let wanted: HashSet<&ItemId> = items.iter().collect();
        let mut tallies: HashMap<ItemId, Tally> = HashMap::new();
        for e in self.votes.iter() {
            let (t, _, i) = e.key();
            if *t == target && wanted.contains(i) {
                count(tallies.entry(*i).or_default(), e.value().1.kind);
            }
        }
        Ok(tallies)
    }
}

fn count(tally: &mut Tally, kind: VoteType) {
    match kind {
        VoteType::Up => tally.up += 1,
        VoteType::Down => tally.down += 1,
    }
}
