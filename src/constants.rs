//! Shared constants used across the application.

/// User agent string sent to the remote listing endpoint.
///
/// The public JSON listings throttle obvious script user agents much harder
/// than browser traffic.
pub const SOURCE_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Upper bound for the `limit` query parameter on the leaderboard endpoint.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;
