//! Error types for platform resolvers.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracklink_core::{ErrorKind, Platform};

/// Errors a resolver call can fail with.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Network or timeout failure; worth retrying
    #[error("transient failure on {platform}: {message}")]
    Transient {
        /// Platform that failed
        platform: Platform,
        /// Failure detail
        message: String,
    },

    /// Platform throttled us (HTTP 429)
    #[error("rate limited by {platform}, retry after {retry_after:?}")]
    RateLimited {
        /// Platform that throttled
        platform: Platform,
        /// Wait requested through `Retry-After`, if any
        retry_after: Option<Duration>,
    },

    /// Request the platform will never answer (blocked, malformed)
    #[error("permanent failure on {platform}: {message}")]
    Permanent {
        /// Platform that refused
        platform: Platform,
        /// Failure detail
        message: String,
    },

    /// Resolver misbehaved (panicked or returned garbage)
    #[error("unexpected resolver failure: {0}")]
    Unexpected(String),

    /// Resolver could not be constructed
    #[error("resolver setup failed: {0}")]
    Setup(String),
}

impl ResolveError {
    /// Map to the per-row error taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::Transient,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Permanent { .. } | Self::Setup(_) => ErrorKind::Permanent,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Whether the call may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Server-requested wait before the next attempt.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Ordering used when several platforms fail: the most actionable error wins.
    #[must_use]
    pub fn severity(&self) -> u8 {
        match self {
            Self::RateLimited { .. } => 3,
            Self::Transient { .. } | Self::Unexpected(_) => 2,
            Self::Permanent { .. } | Self::Setup(_) => 1,
        }
    }

    /// Classify a non-success HTTP status.
    #[must_use]
    pub fn from_status(
        platform: Platform,
        status: StatusCode,
        retry_after: Option<Duration>,
    ) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited {
                platform,
                retry_after,
            }
        } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            Self::Transient {
                platform,
                message: format!("HTTP {status}"),
            }
        } else {
            Self::Permanent {
                platform,
                message: format!("HTTP {status}"),
            }
        }
    }

    /// Classify a transport-level failure.
    #[must_use]
    pub fn from_reqwest(platform: Platform, err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(platform, status, None);
        }

        if err.is_builder() {
            Self::Permanent {
                platform,
                message: err.to_string(),
            }
        } else {
            // timeouts, connect failures, truncated bodies
            Self::Transient {
                platform,
                message: err.to_string(),
            }
        }
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
