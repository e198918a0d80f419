//! Port implementations for [`SqliteStore`].

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Comment, CommentRepository, ItemId, KarmaDecrement, KarmaRepository, LeafDeletion, Mark,
    MarkNamespace, MarkRepository, Post, PostFilter, PostRepository, Tally, UserId, UserProfile,
    UserRepository, Vote, VoteRepository, VoteTarget, VoteType,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{id_blob, item_id, millis, timestamp, user_id, SqliteStore};

/// Appends `(?, ?, ...)` binding each id as a BLOB.
fn push_id_list<'a>(qb: &mut QueryBuilder<'a, Sqlite>, ids: impl IntoIterator<Item = Uuid>) {
    qb.push("(");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id_blob(id));
    }
    list.push_unseparated(")");
}

fn blob(row: &SqliteRow, column: &str) -> anyhow::Result<Vec<u8>> {
    Ok(row.try_get::<Vec<u8>, _>(column)?)
}

fn vote_from(row: &SqliteRow) -> anyhow::Result<Vote> {
    let kind: String = row.try_get("kind")?;
    Ok(Vote {
        author: user_id(&blob(row, "author")?)?,
        item: item_id(&blob(row, "item")?)?,
        kind: VoteType::parse(&kind).with_context(|| format!("unknown vote kind {kind:?}"))?,
        created_at: timestamp(row.try_get("created_at")?)?,
    })
}

fn tally_from(row: &SqliteRow) -> anyhow::Result<Tally> {
    Ok(Tally {
        up: u64::try_from(row.try_get::<i64, _>("up")?)?,
        down: u64::try_from(row.try_get::<i64, _>("down")?)?,
    })
}

fn mark_from(row: &SqliteRow) -> anyhow::Result<Mark> {
    Ok(Mark {
        user: user_id(&blob(row, "user_id")?)?,
        item: item_id(&blob(row, "item")?)?,
        created_at: timestamp(row.try_get("created_at")?)?,
    })
}

fn comment_from(row: &SqliteRow) -> anyhow::Result<Comment> {
    Ok(Comment {
        id: item_id(&blob(row, "id")?)?,
        author: user_id(&blob(row, "author")?)?,
        content: row.try_get("content")?,
        parent: item_id(&blob(row, "parent")?)?,
        root: item_id(&blob(row, "root")?)?,
        depth: u32::try_from(row.try_get::<i64, _>("depth")?)?,
        created_at: timestamp(row.try_get("created_at")?)?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
    })
}

fn post_from(row: &SqliteRow) -> anyhow::Result<Post> {
    Ok(Post {
        id: item_id(&blob(row, "id")?)?,
        author: user_id(&blob(row, "author")?)?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        text: row.try_get("body")?,
        created_at: timestamp(row.try_get("created_at")?)?,
    })
}

fn profile_from(row: &SqliteRow) -> anyhow::Result<UserProfile> {
    Ok(UserProfile {
        id: user_id(&blob(row, "id")?)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        bio: row.try_get("bio")?,
        top_bar_color: row.try_get("top_bar_color")?,
        created_at: timestamp(row.try_get("created_at")?)?,
    })
}

fn collect<T>(rows: Vec<SqliteRow>, map: fn(&SqliteRow) -> anyhow::Result<T>) -> anyhow::Result<Vec<T>> {
    rows.iter().map(map).collect()
}

// ── Votes ────────────────────────────────────────────────────────────────────

#[async_trait]
impl VoteRepository for SqliteStore {
    async fn insert_if_absent(&self, target: VoteTarget, vote: &Vote) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO votes (target, author, item, kind, created_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (target, author, item) DO NOTHING",
        )
        .bind(target.as_str())
        .bind(id_blob(vote.author.0))
        .bind(id_blob(vote.item.0))
        .bind(vote.kind.as_str())
        .bind(millis(vote.created_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(
        &self,
        target: VoteTarget,
        author: UserId,
        item: ItemId,
    ) -> anyhow::Result<Option<Vote>> {
        let row = sqlx::query(
            "DELETE FROM votes WHERE target = ? AND author = ? AND item = ?
             RETURNING author, item, kind, created_at",
        )
        .bind(target.as_str())
        .bind(id_blob(author.0))
        .bind(id_blob(item.0))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(vote_from).transpose()
    }

    async fn find(
        &self,
        target: VoteTarget,
        author: UserId,
        item: ItemId,
    ) -> anyhow::Result<Option<Vote>> {
        let row = sqlx::query(
            "SELECT author, item, kind, created_at FROM votes
             WHERE target = ? AND author = ? AND item = ?",
        )
        .bind(target.as_str())
        .bind(id_blob(author.0))
        .bind(id_blob(item.0))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(vote_from).transpose()
    }

    async fn find_by_author(
        &self,
        target: VoteTarget,
        author: UserId,
    ) -> anyhow::Result<Vec<Vote>> {
        let rows = sqlx::query(
            "SELECT author, item, kind, created_at FROM votes
             WHERE target = ? AND author = ? ORDER BY rowid",
        )
        .bind(target.as_str())
        .bind(id_blob(author.0))
        .fetch_all(&self.pool)
        .await?;
        collect(rows, vote_from)
    }

    async fn find_for_items(
        &self,
        target: VoteTarget,
        author: UserId,
        items: &[ItemId],
    ) -> anyhow::Result<Vec<Vote>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT author, item, kind, created_at FROM votes WHERE target = ",
        );
        qb.push_bind(target.as_str());
        qb.push(" AND author = ").push_bind(id_blob(author.0));
        qb.push(" AND item IN ");
        push_id_list(&mut qb, items.iter().map(|i| i.0));
        qb.push(" ORDER BY rowid");
        let rows = qb.build().fetch_all(&self.pool).await?;
        collect(rows, vote_from)
    }

    async fn tally(&self, target: VoteTarget, item: ItemId) -> anyhow::Result<Tally> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(kind = 'up'), 0) AS up, COALESCE(SUM(kind = 'down'), 0) AS down
             FROM votes WHERE target = ? AND item = ?",
        )
        .bind(target.as_str())
        .bind(id_blob(item.0))
        .fetch_one(&self.pool)
        .await?;
        tally_from(&row)
    }

    async fn tallies(
        &self,
        target: VoteTarget,
        items: &[ItemId],
    ) -> anyhow::Result<HashMap<ItemId, Tally>> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT item, SUM(kind = 'up') AS up, SUM(kind = 'down') AS down
             FROM votes WHERE target = ",
        );
        qb.push_bind(target.as_str());
        qb.push(" AND item IN ");
        push_id_list(&mut qb, items.iter().map(|i| i.0));
        qb.push(" GROUP BY item");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Ok::<_, anyhow::Error>((item_id(&blob(row, "item")?)?, tally_from(row)?)))
            .collect()
    }
}

// ── Karma ────────────────────────────────────────────────────────────────────

#[async_trait]
impl KarmaRepository for SqliteStore {
    async fn points(&self, user: UserId) -> anyhow::Result<Option<u64>> {
        let points: Option<i64> = sqlx::query_scalar("SELECT points FROM karma WHERE user_id = ?")
            .bind(id_blob(user.0))
            .fetch_optional(&self.pool)
            .await?;
        Ok(points.map(u64::try_from).transpose()?)
    }

    async fn add(&self, user: UserId, n: u64) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar(
            "INSERT INTO karma (user_id, points) VALUES (?, ?)
             ON CONFLICT (user_id) DO UPDATE SET points = points + excluded.points
             RETURNING points",
        )
        .bind(id_blob(user.0))
        .bind(i64::try_from(n)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(total)?)
    }

    async fn subtract(&self, user: UserId, n: u64) -> anyhow::Result<KarmaDecrement> {
        let n = i64::try_from(n)?;
        let applied: Option<i64> = sqlx::query_scalar(
            "UPDATE karma SET points = points - ? WHERE user_id = ? AND points >= ?
             RETURNING points",
        )
        .bind(n)
        .bind(id_blob(user.0))
        .bind(n)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(total) = applied {
            return Ok(KarmaDecrement::Applied(u64::try_from(total)?));
        }
        Ok(match self.points(user).await? {
            None => KarmaDecrement::Missing,
            Some(current) => KarmaDecrement::Insufficient(current),
        })
    }
}

// ── Marks ────────────────────────────────────────────────────────────────────

#[async_trait]
impl MarkRepository for SqliteStore {
    async fn insert_if_absent(&self, namespace: MarkNamespace, mark: &Mark) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO marks (namespace, user_id, item, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (namespace, user_id, item) DO NOTHING",
        )
        .bind(namespace.as_str())
        .bind(id_blob(mark.user.0))
        .bind(id_blob(mark.item.0))
        .bind(millis(mark.created_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(
        &self,
        namespace: MarkNamespace,
        user: UserId,
        item: ItemId,
    ) -> anyhow::Result<bool> {
        let result =
            sqlx::query("DELETE FROM marks WHERE namespace = ? AND user_id = ? AND item = ?")
                .bind(namespace.as_str())
                .bind(id_blob(user.0))
                .bind(id_blob(item.0))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists(
        &self,
        namespace: MarkNamespace,
        user: UserId,
        item: ItemId,
    ) -> anyhow::Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM marks WHERE namespace = ? AND user_id = ? AND item = ?)",
        )
        .bind(namespace.as_str())
        .bind(id_blob(user.0))
        .bind(id_blob(item.0))
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn by_user(&self, namespace: MarkNamespace, user: UserId) -> anyhow::Result<Vec<Mark>> {
        let rows = sqlx::query(
            "SELECT user_id, item, created_at FROM marks
             WHERE namespace = ? AND user_id = ? ORDER BY rowid",
        )
        .bind(namespace.as_str())
        .bind(id_blob(user.0))
        .fetch_all(&self.pool)
        .await?;
        collect(rows, mark_from)
    }

    async fn by_item(&self, namespace: MarkNamespace, item: ItemId) -> anyhow::Result<Vec<Mark>> {
        let rows = sqlx::query(
            "SELECT user_id, item, created_at FROM marks
             WHERE namespace = ? AND item = ? ORDER BY rowid",
        )
        .bind(namespace.as_str())
        .bind(id_blob(item.0))
        .fetch_all(&self.pool)
        .await?;
        collect(rows, mark_from)
    }

    async fn by_items(
        &self,
        namespace: MarkNamespace,
        items: &[ItemId],
    ) -> anyhow::Result<Vec<Mark>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT user_id, item, created_at FROM marks WHERE namespace = ");
        qb.push_bind(namespace.as_str());
        qb.push(" AND item IN ");
        push_id_list(&mut qb, items.iter().map(|i| i.0));
        qb.push(" ORDER BY rowid");
        let rows = qb.build().fetch_all(&self.pool).await?;
        collect(rows, mark_from)
    }
}

// ── Comments ─────────────────────────────────────────────────────────────────

#[async_trait]
impl CommentRepository for SqliteStore {
    async fn insert(&self, comment: &Comment) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO comments (id, author, content, parent, root, depth, created_at, updated_at)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?
             WHERE ? = 0 OR EXISTS (SELECT 1 FROM comments WHERE id = ?)",
        )
        .bind(id_blob(comment.id.0))
        .bind(id_blob(comment.author.0))
        .bind(&comment.content)
        .bind(id_blob(comment.parent.0))
        .bind(id_blob(comment.root.0))
        .bind(i64::from(comment.depth))
        .bind(millis(comment.created_at))
        .bind(millis(comment.updated_at))
        .bind(i64::from(comment.depth))
        .bind(id_blob(comment.parent.0))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(id_blob(id.0))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(comment_from).transpose()
    }

    async fn update_content(
        &self,
        id: ItemId,
        content: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query(
            "UPDATE comments SET content = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(content)
        .bind(millis(at))
        .bind(id_blob(id.0))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(comment_from).transpose()
    }

    async fn delete_leaf(&self, id: ItemId) -> anyhow::Result<LeafDeletion> {
        // One statement: the children check and the delete cannot interleave
        // with a concurrent reply.
        let result = sqlx::query(
            "DELETE FROM comments WHERE id = ?
             AND NOT EXISTS (SELECT 1 FROM comments WHERE parent = ?)",
        )
        .bind(id_blob(id.0))
        .bind(id_blob(id.0))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(LeafDeletion::Deleted);
        }
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE id = ?)")
            .bind(id_blob(id.0))
            .fetch_one(&self.pool)
            .await?;
        Ok(if exists {
            LeafDeletion::HasReplies
        } else {
            LeafDeletion::Missing
        })
    }

    async fn by_root(&self, root: ItemId) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query("SELECT * FROM comments WHERE root = ? ORDER BY rowid")
            .bind(id_blob(root.0))
            .fetch_all(&self.pool)
            .await?;
        collect(rows, comment_from)
    }

    async fn by_author(&self, author: UserId) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query("SELECT * FROM comments WHERE author = ? ORDER BY rowid")
            .bind(id_blob(author.0))
            .fetch_all(&self.pool)
            .await?;
        collect(rows, comment_from)
    }

    async fn count_by_roots(&self, roots: &[ItemId]) -> anyhow::Result<HashMap<ItemId, usize>> {
        if roots.is_empty() {
            return Ok(HashMap::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT root, COUNT(*) AS n FROM comments WHERE root IN ");
        push_id_list(&mut qb, roots.iter().map(|r| r.0));
        qb.push(" GROUP BY root");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let n = usize::try_from(row.try_get::<i64, _>("n")?)?;
                Ok::<_, anyhow::Error>((item_id(&blob(row, "root")?)?, n))
            })
            .collect()
    }
}

// ── Posts ────────────────────────────────────────────────────────────────────

#[async_trait]
impl PostRepository for SqliteStore {
    async fn insert(&self, post: &Post) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, author, title, url, body, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id_blob(post.id.0))
        .bind(id_blob(post.author.0))
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.text)
        .bind(millis(post.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: ItemId) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id_blob(id.0))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(post_from).transpose()
    }

    async fn get_many(&self, ids: &[ItemId]) -> anyhow::Result<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE id IN ");
        push_id_list(&mut qb, ids.iter().map(|i| i.0));
        let rows = qb.build().fetch_all(&self.pool).await?;
        collect(rows, post_from)
    }

    async fn replace(&self, post: &Post) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET author = ?, title = ?, url = ?, body = ?, created_at = ? WHERE id = ?",
        )
        .bind(id_blob(post.author.0))
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.text)
        .bind(millis(post.created_at))
        .bind(id_blob(post.id.0))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: ItemId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id_blob(id.0))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, filter: &PostFilter) -> anyhow::Result<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE 1 = 1");
        if let Some(from) = filter.created_from {
            qb.push(" AND created_at >= ").push_bind(millis(from));
        }
        if let Some(until) = filter.created_until {
            qb.push(" AND created_at <= ").push_bind(millis(until));
        }
        qb.push(" ORDER BY created_at DESC, rowid DESC");
        let rows = qb.build().fetch_all(&self.pool).await?;

        // SQLite's lower() is ASCII-only, so the prefix match runs here.
        let by_title = PostFilter {
            title_prefix: filter.title_prefix.clone(),
            ..Default::default()
        };
        Ok(collect(rows, post_from)?
            .into_iter()
            .filter(|p| by_title.matches(p))
            .collect())
    }

    async fn by_author(&self, author: UserId) -> anyhow::Result<Vec<Post>> {
        let rows =
            sqlx::query("SELECT * FROM posts WHERE author = ? ORDER BY created_at DESC, rowid DESC")
                .bind(id_blob(author.0))
                .fetch_all(&self.pool)
                .await?;
        collect(rows, post_from)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for SqliteStore {
    async fn insert(&self, profile: &UserProfile) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, email, bio, top_bar_color, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(id_blob(profile.id.0))
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.bio)
        .bind(&profile.top_bar_color)
        .bind(millis(profile.created_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: UserId) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id_blob(id.0))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(profile_from).transpose()
    }

    async fn get_by_username(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(profile_from).transpose()
    }

    async fn get_many(&self, ids: &[UserId]) -> anyhow::Result<Vec<UserProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id IN ");
        push_id_list(&mut qb, ids.iter().map(|i| i.0));
        let rows = qb.build().fetch_all(&self.pool).await?;
        collect(rows, profile_from)
    }

    async fn update(&self, profile: &UserProfile) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET email = ?, bio = ?, top_bar_color = ? WHERE id = ?",
        )
        .bind(&profile.email)
        .bind(&profile.bio)
        .bind(&profile.top_bar_color)
        .bind(id_blob(profile.id.0))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_votes_hit_the_unique_constraint() {
        let store = store().await;
        let vote = Vote {
            author: UserId::new(),
            item: ItemId::new(),
            kind: VoteType::Up,
            created_at: Utc::now(),
        };
        assert!(VoteRepository::insert_if_absent(&store, VoteTarget::Post, &vote).await.unwrap());
        assert!(!VoteRepository::insert_if_absent(&store, VoteTarget::Post, &vote).await.unwrap());
        assert!(VoteRepository::insert_if_absent(&store, VoteTarget::Comment, &vote).await.unwrap());

        let tally = store.tally(VoteTarget::Post, vote.item).await.unwrap();
        assert_eq!(tally, Tally { up: 1, down: 0 });

        let removed = VoteRepository::remove(&store, VoteTarget::Post, vote.author, vote.item)
            .await
            .unwrap();
        assert_eq!(removed.map(|v| v.kind), Some(VoteType::Up));
    }

    #[tokio::test]
    async fn karma_floor_is_enforced_in_sql() {
        let store = store().await;
        let user = UserId::new();
        assert_eq!(store.subtract(user, 1).await.unwrap(), KarmaDecrement::Missing);
        assert_eq!(store.add(user, 3).await.unwrap(), 3);
        assert_eq!(store.add(user, 2).await.unwrap(), 5);
        assert_eq!(
            store.subtract(user, 6).await.unwrap(),
            KarmaDecrement::Insufficient(5)
        );
        assert_eq!(store.subtract(user, 5).await.unwrap(), KarmaDecrement::Applied(0));
    }

    #[tokio::test]
    async fn leaf_deletion_is_a_single_conditional_delete() {
        let store = store().await;
        let post = ItemId::new();
        let now = Utc::now();
        let top = Comment {
            id: ItemId::new(),
            author: UserId::new(),
            content: "top".into(),
            parent: post,
            root: post,
            depth: 0,
            created_at: now,
            updated_at: now,
        };
        let reply = Comment {
            id: ItemId::new(),
            parent: top.id,
            depth: 1,
            content: "reply".into(),
            ..top.clone()
        };
        CommentRepository::insert(&store, &top).await.unwrap();
        CommentRepository::insert(&store, &reply).await.unwrap();

        assert_eq!(store.delete_leaf(top.id).await.unwrap(), LeafDeletion::HasReplies);
        assert_eq!(store.delete_leaf(reply.id).await.unwrap(), LeafDeletion::Deleted);
        assert_eq!(store.delete_leaf(top.id).await.unwrap(), LeafDeletion::Deleted);
        assert_eq!(store.delete_leaf(top.id).await.unwrap(), LeafDeletion::Missing);

        let late = Comment {
            id: ItemId::new(),
            ..reply
        };
        assert!(!CommentRepository::insert(&store, &late).await.unwrap());
        assert!(CommentRepository::get(&store, late.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn post_listing_filters_by_window_and_prefix() {
        let store = store().await;
        let now = Utc::now();
        let post = |title: &str, age: Duration| Post {
            id: ItemId::new(),
            author: UserId::new(),
            title: title.into(),
            url: None,
            text: Some("body".into()),
            created_at: now - age,
        };
        let stale = post("Ask: stale", Duration::days(5));
        let fresh = post("ask: fresh", Duration::hours(1));
        let other = post("Show: other", Duration::minutes(5));
        for p in [&stale, &fresh, &other] {
            PostRepository::insert(&store, p).await.unwrap();
        }

        let filter = PostFilter {
            created_from: Some(now - Duration::days(4)),
            created_until: None,
            title_prefix: Some("ASK".into()),
        };
        let found = PostRepository::find(&store, &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, fresh.id);
        assert_eq!(found[0].text.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = store().await;
        let profile = UserProfile {
            id: UserId::new(),
            username: "pg".into(),
            email: None,
            bio: None,
            top_bar_color: Some("#ff6600".into()),
            created_at: Utc::now(),
        };
        assert!(UserRepository::insert(&store, &profile).await.unwrap());
        let clash = UserProfile {
            id: UserId::new(),
            ..profile.clone()
        };
        assert!(!UserRepository::insert(&store, &clash).await.unwrap());
        let loaded = store.get_by_username("pg").await.unwrap().unwrap();
        assert_eq!(loaded.id, profile.id);
    }
}
