//! # Settings
//!
//! Layered configuration, lowest precedence first:
//!
//! 1. built-in defaults ([`Settings::default`], rule constants from
//!    `domains::rules`)
//! 2. `forum.toml` in the working directory, or the file named by
//!    `FORUM_CONFIG`
//! 3. `FORUM__*` environment variables, `__` separating nested keys, e.g.
//!    `FORUM__RULES__FLAG_KARMA=10` or `FORUM__STORAGE__BACKEND=sqlite`
//!
//! A `.env` file is loaded into the environment before step 3.

use std::collections::HashMap;

use config::{Config, Environment, File};
use domains::rules::MAX_WINDOW_DAYS;
use domains::ForumRules;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const ENV_PREFIX: &str = "FORUM";
pub const CONFIG_PATH_VAR: &str = "FORUM_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "forum";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    pub rules: ForumRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub database_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

impl Settings {
    /// Loads `.env`, then the file and environment layers.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!(error = %err, "ignoring unreadable .env file");
            }
        }
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::from_layers(file, None)
    }

    /// Builds settings from an explicit file layer. `env` replaces the process
    /// environment when given.
    pub fn from_layers<F>(file: F, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let rules = &self.rules;
        if rules.default_page_size == 0 {
            return Err(invalid("rules.default_page_size", "must be at least 1"));
        }
        if !rules.windows_in_range() {
            return Err(invalid(
                "rules",
                &format!("time windows must lie between 0 and {MAX_WINDOW_DAYS} days"),
            ));
        }
        if rules.decay_exponent.is_nan() || rules.decay_exponent <= 0.0 {
            return Err(invalid("rules.decay_exponent", "must be positive"));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.database_url.is_empty() {
            return Err(invalid("storage.database_url", "required for the sqlite backend"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
