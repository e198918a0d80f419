//! # SQLite adapter
//!
//! Maps the forum records onto a relational schema. Ids are stored as 16-byte
//! BLOBs and timestamps as Unix milliseconds.
//!
//! # Developer Note
//! Every invariant that must survive concurrent requests is pushed into the
//! database: `UNIQUE` constraints for votes, marks and usernames,
//! `ON CONFLICT` upserts for karma, and single conditional statements for
//! the karma floor and leaf-only comment deletion.

mod repos;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use domains::{ItemId, Repositories, UserId};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id            BLOB PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT,
        bio           TEXT,
        top_bar_color TEXT,
        created_at    INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id         BLOB PRIMARY KEY,
        author     BLOB NOT NULL,
        title      TEXT NOT NULL,
        url        TEXT,
        body       TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS posts_created_at ON posts (created_at)",
    "CREATE TABLE IF NOT EXISTS comments (
        id         BLOB PRIMARY KEY,
        author     BLOB NOT NULL,
        content    TEXT NOT NULL,
        parent     BLOB NOT NULL,
        root       BLOB NOT NULL,
        depth      INTEGER NOT NULL CHECK (depth >= 0),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS comments_root ON comments (root)",
    "CREATE INDEX IF NOT EXISTS comments_parent ON comments (parent)",
    "CREATE TABLE IF NOT EXISTS votes (
        target     TEXT NOT NULL,
        author     BLOB NOT NULL,
        item       BLOB NOT NULL,
        kind       TEXT NOT NULL CHECK (kind IN ('up', 'down')),
        created_at INTEGER NOT NULL,
        UNIQUE (target, author, item)
    )",
    "CREATE INDEX IF NOT EXISTS votes_item ON votes (target, item)",
    "CREATE TABLE IF NOT EXISTS karma (
        user_id BLOB PRIMARY KEY,
        points  INTEGER NOT NULL CHECK (points >= 0)
    )",
    "CREATE TABLE IF NOT EXISTS marks (
        namespace  TEXT NOT NULL,
        user_id    BLOB NOT NULL,
        item       BLOB NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (namespace, user_id, item)
    )",
    "CREATE INDEX IF NOT EXISTS marks_item ON marks (namespace, item)",
];

/// One pool backing all six repository ports.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database and creates the schema if missing.
    ///
    /// An in-memory database lives only as long as its connection, so those
    /// get a single connection that is never recycled.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options
            .connect(url)
            .await
            .with_context(|| format!("failed to open sqlite database at {url}"))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(%url, "sqlite store ready");
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn repositories(&self) -> Repositories {
        let store = Arc::new(self.clone());
        Repositories {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            votes: store.clone(),
            karma: store.clone(),
            marks: store,
        }
    }
}

// Helpers for id and timestamp conversion

fn id_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn uuid_from(blob: &[u8]) -> anyhow::Result<Uuid> {
    Uuid::from_slice(blob).context("malformed id column")
}

fn user_id(blob: &[u8]) -> anyhow::Result<UserId> {
    uuid_from(blob).map(UserId)
}

fn item_id(blob: &[u8]) -> anyhow::Result<ItemId> {
    uuid_from(blob).map(ItemId)
}

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn timestamp(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("timestamp out of range: {ms}"))
}
