//! Application configuration management
//!
//! Settings come from the process environment, which `main` first fills from
//! a local `.env` file. The API token is required; everything else has a
//! default. Configuration is validated before any request is built so a
//! missing credential fails without touching the network.

use crate::core::constants::replicate::{
    API_TOKEN_VAR, BASE_URL_VAR, DEFAULT_BASE_URL, POLL_INTERVAL_VAR,
};
use anyhow::{Context, Result, bail};
use std::str::FromStr;
use std::time::Duration;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 90;

/// Default delay between prediction status checks, in seconds
const DEFAULT_POLL_INTERVAL: f64 = 0.5;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Replicate API token
    pub api_token: String,

    /// Replicate API origin
    pub base_url: String,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Delay between prediction status checks
    pub poll_interval: Duration,

    /// Logging level
    pub log_level: String,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The API token is missing or blank
    /// - A numeric setting cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = match lookup(API_TOKEN_VAR) {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => bail!(
                "{} is not set. Add it to your environment or to a .env file",
                API_TOKEN_VAR
            ),
        };

        let base_url = lookup(BASE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let request_timeout = parse_var(&lookup, "REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT)?;

        let poll_seconds = parse_var(&lookup, POLL_INTERVAL_VAR, DEFAULT_POLL_INTERVAL)?;
        let poll_interval = Duration::try_from_secs_f64(poll_seconds)
            .with_context(|| format!("{} must be a non-negative number", POLL_INTERVAL_VAR))?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Config {
            api_token,
            base_url,
            request_timeout,
            poll_interval,
            log_level,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}
