use std::str::FromStr;

use anyhow::{Context, Result};

use crate::resume::mapper::MergePolicy;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` (unset or blank) means no completion capability: deterministic fallback only.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub request_timeout_secs: u64,
    pub rate_limit_backoff_ms: u64,
    pub prefer_caller_fields: bool,
    pub explicit_empty_overrides: bool,
    /// Extra role-title keywords, added to the built-in list.
    pub role_keywords: Vec<String>,
    /// Extra locality keywords, added to the built-in list.
    pub locality_keywords: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 60)?,
            rate_limit_backoff_ms: env_or("RATE_LIMIT_BACKOFF_MS", 1000)?,
            prefer_caller_fields: env_flag("PREFER_CALLER_FIELDS", true)?,
            explicit_empty_overrides: env_flag("EXPLICIT_EMPTY_OVERRIDES", true)?,
            role_keywords: parse_list(&std::env::var("ROLE_KEYWORDS").unwrap_or_default()),
            locality_keywords: parse_list(&std::env::var("LOCALITY_KEYWORDS").unwrap_or_default()),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy {
            prefer_caller_fields: self.prefer_caller_fields,
            explicit_empty_overrides: self.explicit_empty_overrides,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            anthropic_api_key: None,
            port: 8080,
            rust_log: "info".to_string(),
            request_timeout_secs: 60,
            rate_limit_backoff_ms: 1000,
            prefer_caller_fields: true,
            explicit_empty_overrides: true,
            role_keywords: Vec::new(),
            locality_keywords: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_bool(&raw)
            .with_context(|| format!("Environment variable '{key}' must be true/false, got: {raw}")),
        _ => Ok(default),
    }
}

/// Comma-separated list; entries are trimmed and lowercased, blanks dropped.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
