//! # UserDirectory
//!
//! Profile records. Credentials are handled outside the core; this only
//! knows ids, usernames and the user-editable profile fields.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{AppError, Clock, ForumRules, Result, UserId, UserProfile, UserRepository};
use tracing::info;

pub struct UserDirectory {
    repo: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    default_top_bar_color: String,
}

impl UserDirectory {
    pub fn new(repo: Arc<dyn UserRepository>, clock: Arc<dyn Clock>, rules: &ForumRules) -> Self {
        Self {
            repo,
            clock,
            default_top_bar_color: rules.default_top_bar_color.clone(),
        }
    }

    pub async fn create(&self, username: &str) -> Result<UserProfile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::bad_values("username must be non-empty"));
        }
        let profile = UserProfile {
            id: UserId::new(),
            username: username.to_string(),
            email: None,
            bio: None,
            top_bar_color: Some(self.default_top_bar_color.clone()),
            created_at: self.clock.now(),
        };
        if !self.repo.insert(&profile).await? {
            return Err(AppError::not_allowed(format!(
                "user with username \"{username}\" already exists"
            )));
        }
        info!(user = %profile.id, username, "user created");
        Ok(profile)
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<UserProfile> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", id))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<UserProfile> {
        self.repo
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))
    }

    /// Public profiles keyed by id; unknown ids are absent.
    pub async fn profiles(&self, ids: &[UserId]) -> Result<HashMap<UserId, UserProfile>> {
        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }
        let profiles = self.repo.get_many(&unique).await?;
        Ok(profiles.into_iter().map(|p| (p.id, p.public())).collect())
    }

    pub async fn update(
        &self,
        id: UserId,
        email: Option<String>,
        bio: Option<String>,
    ) -> Result<UserProfile> {
        let profile = UserProfile {
            email,
            bio,
            ..self.get_by_id(id).await?
        };
        self.store(profile).await
    }

    pub async fn change_top_bar(&self, id: UserId, color: &str) -> Result<UserProfile> {
        let color = color.trim();
        if color.is_empty() {
            return Err(AppError::bad_values("top bar color must be non-empty"));
        }
        let profile = UserProfile {
            top_bar_color: Some(color.to_string()),
            ..self.get_by_id(id).await?
        };
        self.store(profile).await
    }

    async fn store(&self, profile: UserProfile) -> Result<UserProfile> {
        if !self.repo.update(&profile).await? {
            return Err(AppError::not_found("user", profile.id));
        }
        Ok(profile)
    }
}
