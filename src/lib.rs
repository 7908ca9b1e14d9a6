//! # Hondana - Multi-source content discovery and aggregation library
//!
//! Hondana provides a unified interface for discovering content across any
//! number of pluggable providers. Sources implement one async contract,
//! register themselves — at compile time or at runtime through extension
//! manifests — and a single query fans out to all of them concurrently,
//! merging whatever comes back while tolerating individual failures.
//!
//! ## Features
//!
//! - **Uniform Source Contract**: One trait covers search, listings, detail
//!   lookups, chapter feeds, and page resolution for any transport
//! - **Runtime Extensions**: TOML manifests install new sources against
//!   compiled-in templates, validated and isolated per candidate
//! - **Concurrent Aggregation**: Bounded fan-out with per-branch timeouts
//!   and cooperative cancellation; one flaky provider never sinks a query
//! - **Rate Limiting**: Per-source request spacing enforced across all
//!   concurrent callers
//! - **Async/Await Support**: Built on tokio for high-performance concurrent
//!   operations
//! - **Robust Error Handling**: Comprehensive error types with detailed
//!   context and a clear isolation boundary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hondana::prelude::*;
//! use hondana::error::Result;
//! #[cfg(feature = "source-mangadex")]
//! use hondana::sources::MangaDexSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Arc::new(SourceRegistry::new());
//!     #[cfg(feature = "source-mangadex")]
//!     registry.register(Arc::new(MangaDexSource::new()))?;
//!
//!     let aggregator = SearchAggregator::new(registry);
//!     let results = aggregator
//!         .search(&SearchFilters::from("one piece"), 1)
//!         .await?;
//!
//!     for (source_id, hits) in &results.results {
//!         println!("{}: {} result(s)", source_id, hits.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Installing Extensions
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hondana::extension::{ExtensionLoader, TemplateHost};
//! use hondana::registry::SourceRegistry;
//!
//! # async fn example() -> hondana::Result<()> {
//! let registry = Arc::new(SourceRegistry::new());
//! let host = Arc::new(TemplateHost::with_builtin_templates());
//! let loader = ExtensionLoader::new("./extensions", host, registry.clone());
//!
//! let report = loader.scan().await?;
//! println!("installed {} extension(s)", report.installed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`source`]: The contract every content source implements
//! - [`registry`]: The registration table with enable/disable state
//! - [`extension`]: Runtime discovery and installation of source extensions
//! - [`aggregator`]: Concurrent fan-out queries with grouped results
//! - [`sources`]: Built-in source implementations
//! - [`net`]: HTTP client, rate limiting, and parsing utilities
//! - [`types`]: Core data structures for content, chapters, and filters
//! - [`error`]: Comprehensive error handling
//!
//! ## Partial Failure
//!
//! Aggregate queries isolate per-source failures: a source that errors or
//! times out simply contributes nothing, and a query where every source
//! failed still resolves to an empty success. Only genuine misuse — an
//! unknown source id, a duplicate registration, or a superseded query —
//! surfaces as an error.

pub mod aggregator;
pub mod error;
pub mod extension;
pub mod net;
pub mod registry;
pub mod source;
pub mod sources;
pub mod types;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits, allowing
/// you to import everything you need with a single
/// `use hondana::prelude::*;` statement.
///
/// # Example
///
/// ```rust
/// use hondana::prelude::*;
///
/// // Now you have access to:
/// // - Source trait, SourceRegistry, SearchAggregator
/// // - ContentItem, ContentDetail, Chapter, PageImage, ContentPage
/// // - SearchFilters, SortOrder, Capability, GroupedSearchResults
/// ```
pub mod prelude {
    pub use crate::{
        aggregator::{QueryState, SearchAggregator, SearchResultsExt},
        registry::SourceRegistry,
        source::Source,
        types::{
            Capability, Chapter, ContentDetail, ContentItem, ContentPage, GroupedSearchResults,
            PageImage, SearchFilters, SearchResult, SortOrder,
        },
    };
}

// Re-export main types at crate root for direct access
pub use aggregator::{QueryState, SearchAggregator, SearchResultsExt};
pub use error::{Error, Result};
pub use registry::SourceRegistry;
pub use source::Source;
pub use types::{
    Capability, Chapter, ContentDetail, ContentItem, ContentPage, GroupedSearchResults, PageImage,
    SearchFilters, SearchResult, SortOrder,
};
