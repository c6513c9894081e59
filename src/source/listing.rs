use serde::{Deserialize, Serialize};

/// A post entry as harvested from a forum listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub title: String,
    pub url: String,
    /// Absolute permalink; the stable identity of the post.
    pub permalink: String,
    pub ups: i64,
    pub num_comments: i64,
    /// Creation time in seconds since the Unix epoch, as reported by the source.
    pub created_utc: Option<f64>,
}

/// Top-level listing response: `{ "data": { "children": [ { "data": {...} } ] } }`.
#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Option<Vec<ListingChild>>,
}

#[derive(Debug, Deserialize)]
pub struct ListingChild {
    pub data: ListingEntry,
}

/// Fields of a single listing entry. Everything is optional on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct ListingEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub ups: Option<i64>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub created_utc: Option<f64>,
}

impl ListingResponse {
    /// Convert the listing into raw posts, prefixing relative permalinks with `origin`.
    ///
    /// A response without `data.children` has no entries. Entries without a
    /// permalink have no identity and are dropped.
    #[must_use]
    pub fn into_posts(self, origin: &str) -> Vec<RawPost> {
        let Some(children) = self.data.and_then(|d| d.children) else {
            return Vec::new();
        };

        children
            .into_iter()
            .filter_map(|child| child.data.into_post(origin))
            .collect()
    }
}

impl ListingEntry {
    fn into_post(self, origin: &str) -> Option<RawPost> {
        let permalink = self.permalink.filter(|p| !p.is_empty())?;
        Some(RawPost {
            title: self.title.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            permalink: absolute_permalink(origin, &permalink),
            ups: self.ups.unwrap_or(0),
            num_comments: self.num_comments.unwrap_or(0),
            created_utc: self.created_utc,
        })
    }
}

/// Join the site origin and a relative permalink.
fn absolute_permalink(origin: &str, permalink: &str) -> String {
    let origin = origin.trim_end_matches('/');
    if permalink.starts_with('/') {
        format!("{origin}{permalink}")
    } else {
        format!("{origin}/{permalink}")
    }
}

/// Parse a listing body into raw posts.
///
/// # Errors
///
/// Returns an error if the body is not JSON or does not have the listing shape.
pub fn parse_listing(body: &[u8], origin: &str) -> Result<Vec<RawPost>, serde_json::Error> {
    let listing: ListingResponse = serde_json::from_slice(body)?;
    Ok(listing.into_posts(origin))
}
