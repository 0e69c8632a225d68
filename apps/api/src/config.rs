use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::analysis::matcher::MatchMode;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Overrides the embedded keyword vocabulary.
    pub vocabulary_path: Option<PathBuf>,
    pub match_mode: MatchMode,
    /// Enables the remote fallback scorer when set.
    pub remote_scoring_url: Option<String>,
    pub remote_scoring_api_key: Option<String>,
    pub remote_scoring_timeout: Duration,
    pub analysis_history_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            vocabulary_path: optional_env("VOCABULARY_PATH").map(PathBuf::from),
            match_mode: optional_env("MATCH_MODE")
                .map(|raw| raw.parse::<MatchMode>().map_err(|e| anyhow!(e)))
                .transpose()
                .context("MATCH_MODE must be 'token' or 'substring'")?
                .unwrap_or_default(),
            remote_scoring_url: optional_env("REMOTE_SCORING_URL"),
            remote_scoring_api_key: optional_env("REMOTE_SCORING_API_KEY"),
            remote_scoring_timeout: Duration::from_secs(
                std::env::var("REMOTE_SCORING_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse::<u64>()
                    .context("REMOTE_SCORING_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            analysis_history_limit: std::env::var("ANALYSIS_HISTORY_LIMIT")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<i64>()
                .ok()
                .filter(|limit| *limit > 0)
                .context("ANALYSIS_HISTORY_LIMIT must be a positive integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank are the same thing.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
