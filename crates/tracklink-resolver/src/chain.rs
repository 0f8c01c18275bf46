//! Ordered fallback across platforms.

use crate::error::{ResolveError, Result};
use crate::fourshared::FourSharedResolver;
use crate::resolver::{LinkResolver, Resolution};
use crate::youtube::YouTubeResolver;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use tracklink_core::{Platform, Query, ResolverConfig};

/// Tries each resolver in order and returns the first link found.
///
/// When no platform finds the track and at least one failed, the most
/// severe failure is returned so the caller can decide whether to retry.
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn LinkResolver>>,
}

impl ResolverChain {
    /// Create a chain from explicit resolvers.
    #[must_use]
    pub fn new(resolvers: Vec<Arc<dyn LinkResolver>>) -> Self {
        Self { resolvers }
    }

    /// Build the configured platform chain.
    ///
    /// # Errors
    /// Returns `ResolveError::Setup` for an invalid platform list or base URL.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let order = config
            .platform_order()
            .map_err(|e| ResolveError::Setup(e.to_string()))?;

        let mut resolvers: Vec<Arc<dyn LinkResolver>> = Vec::with_capacity(order.len());
        for platform in order {
            let resolver: Arc<dyn LinkResolver> = match platform {
                Platform::YouTube => Arc::new(YouTubeResolver::new(config)?),
                Platform::FourShared => Arc::new(FourSharedResolver::new(config)?),
            };
            resolvers.push(resolver);
        }

        Ok(Self::new(resolvers))
    }

    /// Number of resolvers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether the chain has no resolvers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[async_trait]
impl LinkResolver for ResolverChain {
    async fn resolve(&self, query: &Query) -> Result<Resolution> {
        let mut worst: Option<ResolveError> = None;

        for resolver in &self.resolvers {
            match resolver.resolve(query).await {
                Ok(Resolution::Found(link)) => return Ok(Resolution::Found(link)),
                Ok(Resolution::NotFound) => {
                    debug!(row = query.row_index, resolver = resolver.name(), "Not found");
                }
                Err(e) => {
                    debug!(row = query.row_index, resolver = resolver.name(), error = %e, "Lookup failed");
                    worst = match worst {
                        Some(prev) if prev.severity() >= e.severity() => Some(prev),
                        _ => Some(e),
                    };
                }
            }
        }

        worst.map_or(Ok(Resolution::NotFound), Err)
    }

    fn name(&self) -> &str {
        "chain"
    }
}
