//! Upstream fetch errors.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when fetching from the GitHub API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The quota is exhausted until `reset_at`. Waited out, never retried.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("GET {url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Whether the backoff policy should retry this error.
    ///
    /// Every non-success response and transport failure is retried; rate
    /// limits are waited out by the caller instead.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Status { .. } | FetchError::Transport { .. } | FetchError::Decode { .. }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// Extract just the first line of an error message.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

pub type Result<T> = std::result::Result<T, FetchError>;
