//! Favorites client configuration.
//!
//! Read once at process start from environment-style variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `API_URL` | required |
//! | `FAVORITES_TIMEOUT_MS` | `10000` |
//! | `FAVORITES_MAX_RETRIES` | `2` |
//! | `FAVORITES_BACKOFF_MS` | `200` |

use std::time::Duration;

use anyhow::{Context, bail};

pub const API_URL_ENV: &str = "API_URL";
pub const TIMEOUT_ENV: &str = "FAVORITES_TIMEOUT_MS";
pub const MAX_RETRIES_ENV: &str = "FAVORITES_MAX_RETRIES";
pub const BACKOFF_ENV: &str = "FAVORITES_BACKOFF_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// Retry policy for transient API failures (exponential backoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Fail on the first error.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): `initial_backoff * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesConfig {
    /// Base URL of the storefront API, without trailing slash.
    pub api_url: String,
    /// Upper bound for a single remote call, retries included.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl FavoritesConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: normalize_url(api_url.into()),
            request_timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Load the configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(API_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("{API_URL_ENV} must be set to the storefront API base URL"))?;

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            bail!("{API_URL_ENV} must be an http(s) URL, got '{api_url}'");
        }

        let mut config = Self::new(api_url);

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a number of milliseconds, got '{raw}'"))?;
            config.request_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(MAX_RETRIES_ENV) {
            config.retry.max_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_RETRIES_ENV} must be a non-negative integer, got '{raw}'"))?;
        }

        if let Some(raw) = lookup(BACKOFF_ENV) {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{BACKOFF_ENV} must be a number of milliseconds, got '{raw}'"))?;
            config.retry.initial_backoff = Duration::from_millis(ms);
        }

        tracing::debug!(
            api_url = %config.api_url,
            timeout = ?config.request_timeout,
            max_retries = config.retry.max_retries,
            "favorites configuration loaded"
        );

        Ok(config)
    }
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
