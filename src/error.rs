use std::time::Duration;

use thiserror::Error;

/// Common result type used across the SDK.
pub type Result<T> = std::result::Result<T, ShilpError>;

/// Unified error enum surfaced by all public APIs.
///
/// Nothing in the SDK catches or retries these; every failure reaches the
/// caller as it was produced.
#[derive(Error, Debug)]
pub enum ShilpError {
    /// Raised locally, before any request is sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// The server answered with a non-2xx status.
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    /// Connect, DNS, timeout or body-read failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// A streamed response did not produce its head, or its next chunk,
    /// within the configured timeout.
    #[error("transport error: no data from server within {0:?}")]
    Timeout(Duration),
    /// The response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShilpError {
    /// HTTP status code carried by [`ShilpError::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            ShilpError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ShilpError::Transport(e) => e.is_timeout(),
            ShilpError::Timeout(_) => true,
            _ => false,
        }
    }
}
