use serde::{Deserialize, Serialize};

/// A stored post, without the internal row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    pub permalink: String,
    pub forum: String,
    pub title: String,
    pub url: String,
    pub ups: i64,
    pub num_comments: i64,
    pub engagement: i64,
    pub created_utc: Option<f64>,
    pub first_seen_at: String,
    pub last_seen_at: String,
}

/// Values written by an upsert. `seen_at` becomes `last_seen_at`, and
/// `first_seen_at` too when the permalink is new.
#[derive(Debug, Clone)]
pub struct PostUpsert<'a> {
    pub permalink: &'a str,
    pub forum: &'a str,
    pub title: &'a str,
    pub url: &'a str,
    pub ups: i64,
    pub num_comments: i64,
    pub engagement: i64,
    pub created_utc: Option<f64>,
    pub seen_at: &'a str,
}
