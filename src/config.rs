use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Source
    pub forums: Vec<String>,
    pub source_base_url: String,
    pub fetch_limit: u32,
    pub rate_limit_retry_delay: Duration,
    pub request_timeout: Duration,

    // Pipeline
    pub top_n: usize,
    pub forum_pause: Duration,
    pub refresh_interval: Option<Duration>,
    pub snapshot_path: Option<PathBuf>,
    pub activity_log_path: PathBuf,

    // Database
    pub database_url: Option<String>,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub allowed_origins: AllowedOrigins,
    pub leaderboard_size: usize,
}

/// CORS origins accepted by the web server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let refresh_secs = parse_env_u64("REFRESH_INTERVAL_SECS", 1800)?;

        Ok(Self {
            // Source
            forums: parse_list(&env_or_default("FORUMS", "n8n,automation")),
            source_base_url: env_or_default("SOURCE_BASE_URL", "https://www.reddit.com")
                .trim_end_matches('/')
                .to_string(),
            fetch_limit: parse_env_u32("FETCH_LIMIT", 100)?,
            rate_limit_retry_delay: Duration::from_secs(parse_env_u64("RATE_LIMIT_RETRY_SECS", 5)?),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            // Pipeline
            top_n: parse_env_usize("TOP_N", 5)?,
            forum_pause: Duration::from_secs(parse_env_u64("FORUM_PAUSE_SECS", 2)?),
            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            snapshot_path: optional_env("SNAPSHOT_PATH").map(PathBuf::from),
            activity_log_path: PathBuf::from(env_or_default(
                "ACTIVITY_LOG_PATH",
                "logs/activities.jsonl",
            )),

            // Database
            database_url: optional_env("DATABASE_URL"),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8000)?,
            allowed_origins: parse_allowed_origins(&env_or_default("ALLOWED_ORIGINS", "*")),
            leaderboard_size: parse_env_usize("LEADERBOARD_SIZE", 5)?,
        })
    }

    /// Configuration with fast, network-free defaults for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            forums: vec!["n8n".to_string(), "automation".to_string()],
            source_base_url: "https://www.reddit.com".to_string(),
            fetch_limit: 100,
            rate_limit_retry_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(10),
            top_n: 5,
            forum_pause: Duration::ZERO,
            refresh_interval: None,
            snapshot_path: None,
            activity_log_path: std::env::temp_dir().join("forum-leaderboard-test.jsonl"),
            database_url: None,
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            allowed_origins: AllowedOrigins::Any,
            leaderboard_size: 5,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forums.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUMS".to_string(),
                message: "at least one forum is required".to_string(),
            });
        }
        if self.fetch_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.top_n == 0 && self.leaderboard_size > 0 {
            return Err(ConfigError::InvalidValue {
                name: "TOP_N".to_string(),
                message: "must be at least 1 when LEADERBOARD_SIZE is non-zero".to_string(),
            });
        }
        match url::Url::parse(&self.source_base_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    name: "SOURCE_BASE_URL".to_string(),
                    message: format!("must be an http(s) URL, got '{}'", self.source_base_url),
                });
            }
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

/// Split a comma-separated list, dropping blanks and surrounding whitespace.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_allowed_origins(value: &str) -> AllowedOrigins {
    if value.trim() == "*" {
        AllowedOrigins::Any
    } else {
        AllowedOrigins::List(parse_list(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("n8n,automation"), vec!["n8n", "automation"]);
        assert_eq!(parse_list(" rust , ,golang "), vec!["rust", "golang"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_allowed_origins() {
        assert_eq!(parse_allowed_origins("*"), AllowedOrigins::Any);
        assert_eq!(
            parse_allowed_origins("https://a.example,https://b.example"),
            AllowedOrigins::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_int_default() {
        assert_eq!(parse_env_u64("NONEXISTENT_VAR_FOR_TEST", 7).unwrap(), 7);
        assert_eq!(parse_env_usize("NONEXISTENT_VAR_FOR_TEST", 3).unwrap(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(Config::for_testing().validate().is_ok());

        let no_forums = Config {
            forums: Vec::new(),
            ..Config::for_testing()
        };
        assert!(no_forums.validate().is_err());

        let bad_url = Config {
            source_base_url: "ftp://example.com".to_string(),
            ..Config::for_testing()
        };
        assert!(bad_url.validate().is_err());

        let zero_limit = Config {
            fetch_limit: 0,
            ..Config::for_testing()
        };
        assert!(zero_limit.validate().is_err());
    }
}
