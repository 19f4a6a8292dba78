use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::extraction::browser::DEFAULT_BROWSER_TIMEOUT;
use crate::llm_client::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::orchestrator::DEFAULT_MAX_RESULTS;
use crate::search::client::DEFAULT_SEARCH_URL;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a number is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub search_api_url: String,
    /// Hosts (and their subdomains) that need a headless browser.
    pub dynamic_domains: Vec<String>,
    pub chrome_path: Option<PathBuf>,
    pub browser_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_results: usize,
    pub message_chunk_chars: usize,
    pub command_prefix: String,
    /// Empty means every caller may run every command.
    pub command_allowed_roles: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            llm_api_key: require_env("LLM_API_KEY")?,
            llm_api_url: env_or("LLM_API_URL", DEFAULT_API_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_MODEL),
            search_api_url: env_or("SEARCH_API_URL", DEFAULT_SEARCH_URL),
            dynamic_domains: split_list(&env_or("DYNAMIC_DOMAINS", "104.com.tw")),
            chrome_path: std::env::var("CHROME_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            browser_timeout_secs: parse_env(
                "BROWSER_TIMEOUT_SECS",
                DEFAULT_BROWSER_TIMEOUT.as_secs(),
            )?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 120)?,
            max_results: parse_env("MAX_RESULTS", DEFAULT_MAX_RESULTS)?,
            message_chunk_chars: parse_env("MESSAGE_CHUNK_CHARS", 2000)?,
            command_prefix: env_or("COMMAND_PREFIX", "!"),
            command_allowed_roles: split_list(&env_or("COMMAND_ALLOWED_ROLES", "")),
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Comma-separated list, blanks removed.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
