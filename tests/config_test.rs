//! Integration tests for environment configuration.

use std::time::Duration;

use forum_leaderboard::config::{AllowedOrigins, Config};
use serial_test::serial;

const VARS: &[&str] = &[
    "FORUMS",
    "SOURCE_BASE_URL",
    "FETCH_LIMIT",
    "TOP_N",
    "REFRESH_INTERVAL_SECS",
    "DATABASE_URL",
    "ALLOWED_ORIGINS",
    "WEB_PORT",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    let config = Config::from_env().expect("defaults should load");

    assert_eq!(config.forums, vec!["n8n", "automation"]);
    assert_eq!(config.source_base_url, "https://www.reddit.com");
    assert_eq!(config.fetch_limit, 100);
    assert_eq!(config.top_n, 5);
    assert_eq!(config.refresh_interval, Some(Duration::from_secs(1800)));
    assert_eq!(config.database_url, None);
    assert_eq!(config.allowed_origins, AllowedOrigins::Any);
    assert_eq!(config.web_port, 8000);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_overrides() {
    clear_env();
    std::env::set_var("FORUMS", "rust, golang");
    std::env::set_var("SOURCE_BASE_URL", "http://localhost:9000/");
    std::env::set_var("REFRESH_INTERVAL_SECS", "0");
    std::env::set_var("DATABASE_URL", "sqlite://data/test.sqlite");
    std::env::set_var("ALLOWED_ORIGINS", "https://a.example,https://b.example");

    let config = Config::from_env().expect("overrides should load");
    clear_env();

    assert_eq!(config.forums, vec!["rust", "golang"]);
    assert_eq!(config.source_base_url, "http://localhost:9000");
    assert_eq!(config.refresh_interval, None);
    assert_eq!(config.database_url.as_deref(), Some("sqlite://data/test.sqlite"));
    assert_eq!(
        config.allowed_origins,
        AllowedOrigins::List(vec![
            "https://a.example".to_string(),
            "https://b.example".to_string()
        ])
    );
}

#[test]
#[serial]
fn test_invalid_number_is_an_error() {
    clear_env();
    std::env::set_var("FETCH_LIMIT", "lots");
    let result = Config::from_env();
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("FETCH_LIMIT"));
}
