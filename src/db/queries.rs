use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{PostRecord, PostUpsert};

const POST_COLUMNS: &str = "permalink, forum, title, url, ups, num_comments, engagement, \
                            created_utc, first_seen_at, last_seen_at";

// ========== Posts ==========

/// Insert a post or refresh the existing row with the same permalink.
///
/// On conflict every mutable column is overwritten and `first_seen_at` is left
/// alone. The statement is atomic per row.
pub async fn upsert_post(pool: &SqlitePool, post: &PostUpsert<'_>) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO posts (permalink, forum, title, url, ups, num_comments, engagement,
                           created_utc, first_seen_at, last_seen_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(permalink) DO UPDATE SET
            forum = excluded.forum,
            title = excluded.title,
            url = excluded.url,
            ups = excluded.ups,
            num_comments = excluded.num_comments,
            engagement = excluded.engagement,
            created_utc = COALESCE(excluded.created_utc, posts.created_utc),
            last_seen_at = excluded.last_seen_at
        ",
    )
    .bind(post.permalink)
    .bind(post.forum)
    .bind(post.title)
    .bind(post.url)
    .bind(post.ups)
    .bind(post.num_comments)
    .bind(post.engagement)
    .bind(post.created_utc)
    .bind(post.seen_at)
    .bind(post.seen_at)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert post {}", post.permalink))?;

    Ok(())
}

/// Get a post by its permalink.
pub async fn get_post_by_permalink(
    pool: &SqlitePool,
    permalink: &str,
) -> Result<Option<PostRecord>> {
    sqlx::query_as(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE permalink = ?"
    ))
    .bind(permalink)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch post by permalink")
}

/// Get the most engaging posts of a forum. Ties go to the earliest stored row.
pub async fn get_top_posts(pool: &SqlitePool, forum: &str, limit: i64) -> Result<Vec<PostRecord>> {
    sqlx::query_as(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE forum = ? ORDER BY engagement DESC, id ASC LIMIT ?"
    ))
    .bind(forum)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch top posts")
}

/// Count stored posts of a forum.
pub async fn count_posts(pool: &SqlitePool, forum: &str) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE forum = ?")
        .bind(forum)
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(row.0)
}
