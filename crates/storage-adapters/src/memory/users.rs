use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{UserId, UserProfile, UserRepository};

/// Profiles plus a username index. The index entry is claimed first, so two
/// concurrent signups for one name cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    profiles: DashMap<UserId, UserProfile>,
    usernames: DashMap<String, UserId>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, profile: &UserProfile) -> anyhow::Result<bool> {
        match self.usernames.entry(profile.username.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.profiles.insert(profile.id, profile.clone());
                slot.insert(profile.id);
                Ok(true)
            }
        }
    }

    async fn get(&self, id: UserId) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }

    async fn get_by_username(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        let Some(id) = self.usernames.get(username).map(|e| *e) else {
            return Ok(None);
        };
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }

    async fn get_many(&self, ids: &[UserId]) -> anyhow::Result<Vec<UserProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| p.value().clone()))
            .collect())
    }

    async fn update(&self, profile: &UserProfile) -> anyhow::Result<bool> {
        match self.profiles.get_mut(&profile.id) {
            Some(mut slot) => {
                if slot.username != profile.username {
                    anyhow::bail!("usernames cannot be changed");
                }
                *slot = profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
