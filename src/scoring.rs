//! Engagement scoring and top-N selection.

use serde::{Deserialize, Serialize};

use crate::source::RawPost;

/// A raw post with its derived engagement score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: RawPost,
    pub engagement: i64,
}

/// Engagement of a post: popularity plus comment count.
#[must_use]
pub fn engagement(post: &RawPost) -> i64 {
    post.ups.saturating_add(post.num_comments)
}

/// Score every post and keep the `top_n` most engaging.
///
/// Ties keep their input order. Returns everything when fewer than `top_n`
/// posts are supplied.
#[must_use]
pub fn score_posts(posts: Vec<RawPost>, top_n: usize) -> Vec<ScoredPost> {
    let mut scored: Vec<ScoredPost> = posts
        .into_iter()
        .map(|post| ScoredPost {
            engagement: engagement(&post),
            post,
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.engagement.cmp(&a.engagement));
    scored.truncate(top_n);
    scored
}
