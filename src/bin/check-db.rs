//! Print how many posts are stored per configured forum, with the current leader.

use anyhow::{Context, Result};

use forum_leaderboard::config::Config;
use forum_leaderboard::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    println!("Checking stored posts...");
    let store = Store::connect(config.database_url.as_deref()).await;
    if !store.is_connected() {
        anyhow::bail!("could not connect to the database (is DATABASE_URL set?)");
    }

    let leaders = store.query_latest(&config.forums, 1).await;
    for forum in &config.forums {
        let count = store.count_posts(forum).await.unwrap_or(0);
        println!("Forum {forum}: {count} posts stored.");
        if let Some(top) = leaders.get(forum).and_then(|posts| posts.first()) {
            println!("  Top post: {} ({} engagement)", top.title, top.engagement);
        }
    }

    Ok(())
}
