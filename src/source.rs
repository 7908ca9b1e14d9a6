//! The uniform contract every content source implements.
//!
//! This module defines the core [`Source`] trait that all content sources
//! implement. A source wraps one provider (a remote API, a scraped website,
//! a directory on disk) behind a single async interface, so registry,
//! loader, and aggregation code never care where content actually comes
//! from.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use hondana::error::Result;
//! use hondana::prelude::*;
//!
//! struct MySource;
//!
//! #[async_trait]
//! impl Source for MySource {
//!     fn id(&self) -> &str {
//!         "my-source"
//!     }
//!
//!     fn name(&self) -> &str {
//!         "My Source"
//!     }
//!
//!     fn base_url(&self) -> &str {
//!         "https://example.com"
//!     }
//!
//!     fn capabilities(&self) -> &[Capability] {
//!         &[Capability::Search, Capability::ChapterList, Capability::PageList]
//!     }
//!
//!     async fn search(
//!         &self,
//!         query: &str,
//!         page: u32,
//!         _filters: &SearchFilters,
//!     ) -> Result<ContentPage<ContentItem>> {
//!         let _ = query;
//!         Ok(ContentPage::empty(page))
//!     }
//!
//!     async fn get_content_details(&self, content_id: &str) -> Result<ContentDetail> {
//!         Err(hondana::Error::not_found(content_id))
//!     }
//!
//!     async fn get_chapter_list(&self, _content_id: &str) -> Result<Vec<Chapter>> {
//!         Ok(vec![])
//!     }
//!
//!     async fn get_page_list(&self, _chapter_id: &str) -> Result<Vec<PageImage>> {
//!         Ok(vec![])
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::{
    error::{Error, Result},
    types::{
        Capability, Chapter, ContentDetail, ContentItem, ContentPage, PageImage, SearchFilters,
        SourceDescriptor, SourceFilter,
    },
};

/// Trait that all content sources must implement.
///
/// The `Source` trait defines the interface for content sources, providing
/// methods for searching, listing, and retrieving content, chapters, and
/// pages. Identity accessors are synchronous and cheap; everything that
/// talks to a provider is async and returns [`Result`].
///
/// # Required Methods
///
/// * [`id()`](Source::id) - Unique identifier for the source
/// * [`name()`](Source::name) - Human-readable name
/// * [`base_url()`](Source::base_url) - Base URL of the source
/// * [`capabilities()`](Source::capabilities) - Advertised feature flags
/// * [`search()`](Source::search) - Search for content
/// * [`get_content_details()`](Source::get_content_details) - Full detail record
/// * [`get_chapter_list()`](Source::get_chapter_list) - Chapters of a title
/// * [`get_page_list()`](Source::get_page_list) - Pages of a chapter
///
/// The listing operations ([`get_latest`](Source::get_latest),
/// [`get_popular`](Source::get_popular)) and the browse pair
/// ([`browse`](Source::browse), [`get_filters`](Source::get_filters))
/// default to [`Error::CapabilityUnsupported`], so sources without those
/// features stay honest about it.
///
/// # Implementation Guidelines
///
/// - Use the [`net::HttpClient`](crate::net::HttpClient) for HTTP requests
/// - Advertise [`Capability::RateLimited`] and override
///   [`min_interval`](Source::min_interval) when the provider publishes limits
/// - Return detailed errors using the [`Error`](crate::Error) types
/// - Ensure all returned items have the correct `source_id` set
///
/// Implementations must be `Send + Sync`; the aggregation layer shares them
/// across tasks as `Arc<dyn Source>`.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the unique identifier for this source.
    ///
    /// The ID should be a lowercase, hyphen-separated string that uniquely
    /// identifies this source. The registry keys entries by it and rejects
    /// duplicates, so it must stay stable across versions.
    ///
    /// # Examples
    ///
    /// ```text
    /// "mangadex", "local", "madara-toonily"
    /// ```
    fn id(&self) -> &str;

    /// Returns the human-readable name of this source.
    ///
    /// Displayed to users; should be the official name of the website or
    /// service.
    fn name(&self) -> &str;

    /// Returns the base URL of this source.
    ///
    /// This should be the root URL of the provider, without any trailing
    /// slashes or specific paths. Filesystem sources return a path-like
    /// string instead.
    fn base_url(&self) -> &str;

    /// Returns the primary content language as a BCP 47 tag.
    ///
    /// Defaults to `"en"`.
    fn language(&self) -> &str {
        "en"
    }

    /// Returns the implementation version of this source.
    ///
    /// Sources installed through the extension loader report their manifest
    /// version here so update checks can compare against newer manifests.
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Returns the feature flags this source advertises.
    ///
    /// Operations outside this set fail with
    /// [`Error::CapabilityUnsupported`] instead of panicking, and the
    /// aggregation layer skips sources that lack the capability a query
    /// needs.
    fn capabilities(&self) -> &[Capability];

    /// Returns `true` when `capability` is advertised.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hondana::prelude::*;
    /// # fn check(source: &dyn Source) {
    /// if source.supports(Capability::Latest) {
    ///     println!("{} can list recent updates", source.name());
    /// }
    /// # }
    /// ```
    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Minimum delay between two requests dispatched to this source.
    ///
    /// The shared [`RateLimiter`](crate::net::RateLimiter) enforces this
    /// interval across all concurrent callers. Defaults to 200ms; sources
    /// with published limits should override it.
    fn min_interval(&self) -> Duration {
        Duration::from_millis(200)
    }

    /// Searches for content matching the given query.
    ///
    /// # Parameters
    ///
    /// * `query` - The free-text search query
    /// * `page` - 1-based result page to fetch
    /// * `filters` - Structured filters; sources apply what they understand
    ///   natively and may ignore the rest, since the aggregation layer
    ///   re-applies genre and status filters afterwards
    ///
    /// # Returns
    ///
    /// One [`ContentPage`] of matching items, in the source's natural order.
    ///
    /// # Errors
    ///
    /// * [`Error::Network`](crate::Error::Network) - For network/connection issues
    /// * [`Error::Parse`](crate::Error::Parse) - For malformed provider responses
    /// * [`Error::RemoteFailure`](crate::Error::RemoteFailure) - When the provider
    ///   reports an error of its own
    async fn search(
        &self,
        query: &str,
        page: u32,
        filters: &SearchFilters,
    ) -> Result<ContentPage<ContentItem>>;

    /// Retrieves the full detail record for one piece of content.
    ///
    /// # Parameters
    ///
    /// * `content_id` - The unique identifier of the content within this source
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`](crate::Error::NotFound) - If the content doesn't exist
    /// * [`Error::Network`](crate::Error::Network) - For network/connection issues
    async fn get_content_details(&self, content_id: &str) -> Result<ContentDetail>;

    /// Retrieves the list of chapters for a specific piece of content.
    ///
    /// Chapters are returned in reading order: ascending by number, ties
    /// broken by volume (see [`Chapter::ordering`]). Special chapters use
    /// decimal numbers (12.5).
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`](crate::Error::NotFound) - If the content doesn't exist
    /// * [`Error::Network`](crate::Error::Network) - For network/connection issues
    async fn get_chapter_list(&self, content_id: &str) -> Result<Vec<Chapter>>;

    /// Retrieves the pages of a specific chapter, ordered by index.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`](crate::Error::NotFound) - If the chapter doesn't exist
    /// * [`Error::Network`](crate::Error::Network) - For network/connection issues
    async fn get_page_list(&self, chapter_id: &str) -> Result<Vec<PageImage>>;

    /// Lists recently updated content.
    ///
    /// Only meaningful when [`Capability::Latest`] is advertised; the
    /// default implementation returns
    /// [`Error::CapabilityUnsupported`].
    async fn get_latest(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        let _ = page;
        Err(Error::capability(self.id(), Capability::Latest))
    }

    /// Lists popular content.
    ///
    /// Only meaningful when [`Capability::Popular`] is advertised; the
    /// default implementation returns
    /// [`Error::CapabilityUnsupported`].
    async fn get_popular(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        let _ = page;
        Err(Error::capability(self.id(), Capability::Popular))
    }

    /// Browses the catalog using source-defined filter values.
    ///
    /// Keys in `filters` are the ids returned by
    /// [`get_filters`](Source::get_filters). Only meaningful when
    /// [`Capability::BrowseFilters`] is advertised.
    async fn browse(
        &self,
        filters: &HashMap<String, String>,
        page: u32,
    ) -> Result<ContentPage<ContentItem>> {
        let _ = (filters, page);
        Err(Error::capability(self.id(), Capability::BrowseFilters))
    }

    /// Returns the declarative browse filters this source understands.
    ///
    /// Only meaningful when [`Capability::BrowseFilters`] is advertised.
    async fn get_filters(&self) -> Result<Vec<SourceFilter>> {
        Err(Error::capability(self.id(), Capability::BrowseFilters))
    }
}

impl std::fmt::Debug for dyn Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

impl SourceDescriptor {
    /// Builds a descriptor snapshot from a live source.
    ///
    /// The `enabled` flag comes from the registry, not the source itself; a
    /// source instance has no notion of being switched off.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hondana::prelude::*;
    /// # use hondana::types::SourceDescriptor;
    /// # fn describe(source: &dyn Source) {
    /// let descriptor = SourceDescriptor::from_source(source, true);
    /// assert_eq!(descriptor.id, source.id());
    /// assert!(descriptor.enabled);
    /// # }
    /// ```
    pub fn from_source(source: &dyn Source, enabled: bool) -> Self {
        SourceDescriptor {
            id: source.id().to_string(),
            name: source.name().to_string(),
            base_url: source.base_url().to_string(),
            language: source.language().to_string(),
            version: source.version().to_string(),
            enabled,
            capabilities: source.capabilities().to_vec(),
        }
    }
}
