//! # Forum seed
//!
//! Composition root: loads settings, installs the tracing subscriber, wires
//! the configured storage adapter into `ForumService`, seeds a small demo
//! forum and prints the ranked front page as JSON on stdout.

use std::sync::Arc;

use anyhow::Context;
use configs::{LoggingSettings, Settings, StorageBackend, StorageSettings};
use domains::{PostDraft, Repositories, Session, SystemClock};
use services::{CommentVoteAction, FeedRequest, ForumService, PostVoteAction};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.logging);

    let repos = open_storage(&settings.storage).await?;
    let forum = ForumService::new(repos, Arc::new(SystemClock), settings.rules.clone());

    seed(&forum).await.context("seeding demo data")?;

    let front_page = forum
        .get_posts(&Session::anonymous(), &FeedRequest::default())
        .await?;
    println!("{}", serde_json::to_string_pretty(&front_page)?);
    Ok(())
}

fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_storage(storage: &StorageSettings) -> anyhow::Result<Repositories> {
    match storage.backend {
        StorageBackend::Memory => Ok(storage_adapters::memory::repositories()),
        #[cfg(feature = "db-sqlite")]
        StorageBackend::Sqlite => {
            let store =
                storage_adapters::sqlite::SqliteStore::connect(&storage.database_url).await?;
            Ok(store.repositories())
        }
        #[cfg(not(feature = "db-sqlite"))]
        StorageBackend::Sqlite => {
            anyhow::bail!("storage.backend = \"sqlite\" needs the `db-sqlite` feature")
        }
    }
}

async fn seed(forum: &ForumService) -> anyhow::Result<()> {
    let anonymous = Session::anonymous();
    let mut sessions = Vec::new();
    for name in ["pg", "dang", "tptacek", "patio11"] {
        let user = forum.register(&anonymous, name).await?;
        sessions.push(Session::for_user(user.profile.id));
    }
    let [pg, dang, tptacek, patio11] = sessions[..] else {
        anyhow::bail!("expected four demo users");
    };

    let essay = forum
        .create_post(
            &pg,
            PostDraft {
                title: "How to Do Great Work".into(),
                url: Some("https://paulgraham.com/greatwork.html".into()),
                text: None,
            },
        )
        .await?;
    let ask = forum
        .create_post(
            &dang,
            PostDraft {
                title: "Ask: What are you working on this month?".into(),
                url: None,
                text: Some("Share what you are building.".into()),
            },
        )
        .await?;
    let show = forum
        .create_post(&patio11, PostDraft::titled("Show: A tiny invoicing tool"))
        .await?;

    for voter in [&dang, &tptacek, &patio11] {
        forum.vote_post(voter, essay.id, PostVoteAction::Up).await?;
    }
    forum.vote_post(&tptacek, ask.id, PostVoteAction::Up).await?;
    forum.vote_post(&pg, show.id, PostVoteAction::Up).await?;

    let top = forum
        .create_comment(&tptacek, "The section on curiosity resonates.", essay.id)
        .await?;
    let reply = forum
        .create_comment(&pg, "Curiosity is the engine of it.", top.id)
        .await?;
    forum
        .create_comment(&patio11, "Invoices, mostly.", ask.id)
        .await?;
    forum
        .vote_comment(&dang, reply.id, CommentVoteAction::Upvote)
        .await?;

    forum.favorite_post(&dang, essay.id).await?;
    forum.hide_post(&tptacek, show.id).await?;

    info!(posts = 3, comments = 3, "demo forum seeded");
    Ok(())
}
