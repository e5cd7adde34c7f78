//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SESSION_FILE: &str = ".catalog-session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API URL `{0}`: expected an http:// or https:// URL")]
    InvalidApiUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base path; every request under it is credentialed.
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build a config for `api_base_url` with default storage and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] unless the URL is http(s).
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_api_url(api_base_url)?,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            timeouts: Timeouts::default(),
        })
    }

    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `CATALOG_API_URL`: API base path (default `http://localhost:5000/api`)
    /// - `CATALOG_SESSION_FILE`: durable session file (default `.catalog-session.json`)
    /// - `CATALOG_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CATALOG_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] if `CATALOG_API_URL` is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("CATALOG_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let session_file = std::env::var("CATALOG_SESSION_FILE").unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_owned());
        let timeouts = Timeouts {
            request_secs: env_parse_u64("CATALOG_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("CATALOG_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_base_url: normalize_api_url(&api_url)?, session_file: PathBuf::from(session_file), timeouts })
    }

    /// Replace the API base path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiUrl`] unless the URL is http(s).
    pub fn with_api_base_url(mut self, api_base_url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_api_url(api_base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_session_file(mut self, session_file: impl Into<PathBuf>) -> Self {
        self.session_file = session_file.into();
        self
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match host {
        Some(host) if !host.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidApiUrl(raw.to_owned())),
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
