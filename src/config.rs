use std::env;
use std::time::Duration;

use crate::error::{Result, ShilpError};

/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection configuration for a Shilp server.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base endpoint, e.g. `http://localhost:3000`. Trailing slashes are ignored.
    pub base_url: String,
    /// Bounds every JSON request end to end. For exports and event streams it
    /// bounds the wait for the response head and then each read.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Build configuration from environment variables:
    /// `SHILP_BASE_URL`, `SHILP_TIMEOUT_SECS` (optional, default 30).
    pub fn from_env() -> Result<Self> {
        let base_url = require_env("SHILP_BASE_URL")?;
        let timeout_secs = parse_env("SHILP_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub(crate) fn normalized_base_url(&self) -> Result<String> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ShilpError::Config("base url must not be empty".into()));
        }
        Ok(trimmed.to_string())
    }
}

fn require_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| ShilpError::Config(format!("missing env: {key}")))
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
