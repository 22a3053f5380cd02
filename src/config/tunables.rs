//! Environment-sourced pipeline knobs
//!
//! Every value has a default; `from_env` reads the process environment (after
//! `.env` has been loaded by the binary) and rejects values that do not parse.

use crate::ConfigError;
use std::str::FromStr;
use std::time::Duration;

/// Accept-Language sent with both header profiles unless overridden
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en,en-GB;q=0.9,en-US;q=0.8";

/// Hosts whose Last-Modified header does not date their content
pub const DEFAULT_EVERGREEN_DOMAINS: &[&str] = &["*.iso.org"];

/// Largest accepted age window (about a century)
pub const MAX_AGE_DAYS_LIMIT: i64 = 36_500;

/// Largest accepted backoff base, in seconds
pub const MAX_BACKOFF_BASE: f64 = 60.0;

/// Tunable parameters for fetching and extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Tunables {
    /// Simultaneous article extractions across all sources
    pub fetch_concurrency: usize,

    /// Simultaneous in-flight requests per origin
    pub per_host_concurrency: usize,

    /// Minimum body length in characters for an article to be kept
    pub min_text_length: usize,

    /// Age window for the recency gate
    pub max_age_days: i64,

    /// Per-request timeout
    pub http_timeout: Duration,

    /// Retries after the first attempt for transient failures
    pub http_retries: u32,

    /// Backoff base in seconds
    pub http_backoff_base: f64,

    /// Accept-Language header value
    pub accept_language: String,

    /// Wildcard host patterns whose Last-Modified header is ignored
    pub evergreen_domains: Vec<String>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            fetch_concurrency: 6,
            per_host_concurrency: 2,
            min_text_length: 600,
            max_age_days: 7,
            http_timeout: Duration::from_secs(20),
            http_retries: 3,
            http_backoff_base: 0.8,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            evergreen_domains: DEFAULT_EVERGREEN_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl Tunables {
    /// Reads tunables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads tunables through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let timeout_secs: f64 = parse_or(
            &lookup,
            "HTTP_TIMEOUT",
            defaults.http_timeout.as_secs_f64(),
        )?;
        let http_timeout = Duration::try_from_secs_f64(timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .ok_or_else(|| invalid("HTTP_TIMEOUT", timeout_secs))?;

        let tunables = Self {
            fetch_concurrency: parse_or(&lookup, "FETCH_CONCURRENCY", defaults.fetch_concurrency)?,
            per_host_concurrency: parse_or(
                &lookup,
                "PER_HOST_CONCURRENCY",
                defaults.per_host_concurrency,
            )?,
            min_text_length: parse_or(&lookup, "MIN_TEXT_LENGTH", defaults.min_text_length)?,
            max_age_days: parse_or(&lookup, "MAX_AGE_DAYS", defaults.max_age_days)?,
            http_timeout,
            http_retries: parse_or(&lookup, "HTTP_RETRIES", defaults.http_retries)?,
            http_backoff_base: parse_or(&lookup, "HTTP_BACKOFF_BASE", defaults.http_backoff_base)?,
            accept_language: lookup("HTTP_ACCEPT_LANGUAGE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.accept_language),
            evergreen_domains: lookup("EVERGREEN_DOMAINS")
                .map(|v| {
                    v.split(',')
                        .map(|d| d.trim().to_lowercase())
                        .filter(|d| !d.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.evergreen_domains),
        };

        tunables.validate()?;
        Ok(tunables)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_concurrency < 1 {
            return Err(invalid("FETCH_CONCURRENCY", self.fetch_concurrency));
        }
        if self.per_host_concurrency < 1 {
            return Err(invalid("PER_HOST_CONCURRENCY", self.per_host_concurrency));
        }
        if !(0..=MAX_AGE_DAYS_LIMIT).contains(&self.max_age_days) {
            return Err(invalid("MAX_AGE_DAYS", self.max_age_days));
        }
        if !(0.0..=MAX_BACKOFF_BASE).contains(&self.http_backoff_base) {
            return Err(invalid("HTTP_BACKOFF_BASE", self.http_backoff_base));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| invalid(key, raw.trim())),
        _ => Ok(default),
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidTunable {
        key: key.to_string(),
        value: value.to_string(),
    }
}
