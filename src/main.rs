use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_leaderboard::activity::ActivityLog;
use forum_leaderboard::config::Config;
use forum_leaderboard::pipeline::{refresh_loop, Pipeline};
use forum_leaderboard::store::Store;
use forum_leaderboard::web;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting forum-leaderboard");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        forums = ?config.forums,
        source = %config.source_base_url,
        "Configuration loaded"
    );

    // Connected once; a failure here leaves persistence off until restart
    let store = Store::connect(config.database_url.as_deref()).await;
    let activity = ActivityLog::new(&config.activity_log_path);
    info!(path = %activity.path().display(), "Activity log");

    let config = Arc::new(config);
    let pipeline = Arc::new(
        Pipeline::new(config.clone(), store, activity).context("Failed to build pipeline")?,
    );

    let refresh_handle = config.refresh_interval.map(|interval| {
        info!(interval_secs = interval.as_secs(), "Scheduled refresh enabled");
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            refresh_loop(pipeline, interval).await;
        })
    });
    if refresh_handle.is_none() {
        info!("Scheduled refresh disabled");
    }

    let state = web::AppState::new(pipeline);
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(state).await {
            error!("Web server error: {e:#}");
        }
    });

    shutdown_signal().await;

    info!("Shutting down...");

    web_handle.abort();
    if let Some(handle) = refresh_handle {
        handle.abort();
    }

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_leaderboard=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
