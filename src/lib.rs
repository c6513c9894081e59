//! Forum leaderboard library.
//!
//! Periodically harvests the newest posts of a few forums from a public JSON
//! listing, ranks them by engagement, keeps the latest snapshot of every post
//! in SQLite, and serves the leaderboard over HTTP.

pub mod activity;
pub mod config;
pub mod constants;
pub mod db;
pub mod pipeline;
pub mod scoring;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod web;
