//! Tracklink Resolver - link lookup on external platforms.
//!
//! Every platform is a [`LinkResolver`]: given a [`Query`] it answers with a
//! [`Link`], "not found", or a classified [`ResolveError`]. The orchestrator
//! only ever sees that trait; transport and page parsing stay in here.
//!
//! # Features
//!
//! - Query cleanup and search variants (accent folding, noise-term removal)
//! - YouTube search page scraping (`ytInitialData` walk)
//! - 4shared search page scraping with relevance scoring
//! - Ordered fallback across platforms via [`ResolverChain`]
//!
//! [`Query`]: tracklink_core::Query
//! [`Link`]: tracklink_core::Link

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod chain;
pub mod error;
pub mod fourshared;
pub mod http;
pub mod normalize;
pub mod resolver;
pub mod youtube;

// Re-export commonly used types
pub use chain::ResolverChain;
pub use error::{ResolveError, Result};
pub use fourshared::FourSharedResolver;
pub use normalize::{clean_query, normalize_text, search_variants};
pub use resolver::{LinkResolver, Resolution};
pub use youtube::YouTubeResolver;
