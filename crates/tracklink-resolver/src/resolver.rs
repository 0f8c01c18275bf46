//! The link resolver capability.

use crate::error::Result;
use async_trait::async_trait;
use tracklink_core::{Link, Query};

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A link was found
    Found(Link),
    /// The platform answered but had no match
    NotFound,
}

/// Trait for platform lookups.
///
/// Implementations must be thread-safe (Send + Sync): one resolver instance is
/// shared by every worker of every job.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Look up one query.
    ///
    /// # Errors
    /// Returns a retryable error for network trouble or rate limiting, and a
    /// permanent error for requests the platform will never answer.
    async fn resolve(&self, query: &Query) -> Result<Resolution>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}
