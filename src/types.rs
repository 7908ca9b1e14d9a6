//! Core data types for content, chapters, search filters, and source metadata.
//!
//! This module defines the fundamental data structures used throughout Hondana:
//!
//! - [`ContentItem`] / [`ContentDetail`] - Provider-returned content descriptions
//! - [`Chapter`] / [`PageImage`] - Ordered sub-units of content and their pages
//! - [`ContentPage`] - One page of paginated results
//! - [`SearchFilters`] - Parameters for querying sources
//! - [`SourceDescriptor`] / [`Capability`] - Source identity and feature flags
//! - [`GroupedSearchResults`] - Aggregated, per-source search output
//!
//! # Examples
//!
//! ```rust
//! use hondana::types::*;
//!
//! let item = ContentItem {
//!     id: "one-piece".to_string(),
//!     title: "One Piece".to_string(),
//!     cover_url: Some("https://example.com/cover.jpg".to_string()),
//!     url: None,
//!     status: PublicationStatus::Ongoing,
//!     rating: Some(9.2),
//!     genres: vec!["Action".to_string(), "Adventure".to_string()],
//!     source_id: "mangadex".to_string(),
//! };
//!
//! assert_eq!(item.status, PublicationStatus::Ongoing);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Feature flags a source advertises.
///
/// Capabilities let callers discover what an implementation supports before
/// invoking it. Operations guarded by a capability fail with
/// [`Error::CapabilityUnsupported`](crate::Error::CapabilityUnsupported)
/// when the flag is absent, instead of crashing.
///
/// # Examples
///
/// ```rust
/// use hondana::types::Capability;
///
/// let caps = [Capability::Search, Capability::ChapterList];
/// assert!(caps.contains(&Capability::Search));
/// assert!(!caps.contains(&Capability::BrowseFilters));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Free-text search.
    Search,
    /// Recently updated listings.
    Latest,
    /// Popularity-ordered listings.
    Popular,
    /// Declarative browse filters.
    BrowseFilters,
    /// Chapter/episode listings.
    ChapterList,
    /// Page/segment listings.
    PageList,
    /// The source requires a login (flagged, never exercised here).
    AuthRequired,
    /// The source publishes a request rate limit.
    RateLimited,
    /// The source may return adult content.
    NsfwContent,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Capability::Search => "SEARCH",
            Capability::Latest => "LATEST",
            Capability::Popular => "POPULAR",
            Capability::BrowseFilters => "BROWSE_FILTERS",
            Capability::ChapterList => "CHAPTER_LIST",
            Capability::PageList => "PAGE_LIST",
            Capability::AuthRequired => "AUTH_REQUIRED",
            Capability::RateLimited => "RATE_LIMITED",
            Capability::NsfwContent => "NSFW_CONTENT",
        };
        f.write_str(tag)
    }
}

/// Identity and capability descriptor for a registered source.
///
/// The `id` is assigned once at registration and never reused while results
/// referencing it may still be outstanding. `enabled` is the only mutable
/// part and is owned by the registry; toggling it does not destroy the
/// source instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Globally unique, stable identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Root URL of the provider.
    pub base_url: String,

    /// Primary content language (BCP 47 tag, e.g. "en").
    pub language: String,

    /// Implementation version.
    pub version: String,

    /// Whether the source participates in aggregation.
    pub enabled: bool,

    /// Advertised feature flags.
    pub capabilities: Vec<Capability>,
}

/// Publication status of a piece of content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    #[default]
    Unknown,
}

impl PublicationStatus {
    /// Parses a provider-supplied status string, case-insensitively.
    ///
    /// Unrecognized values map to [`PublicationStatus::Unknown`] rather than
    /// failing, since providers are free to invent their own vocabulary.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::types::PublicationStatus;
    ///
    /// assert_eq!(PublicationStatus::parse("Ongoing"), PublicationStatus::Ongoing);
    /// assert_eq!(PublicationStatus::parse("hiatus"), PublicationStatus::Hiatus);
    /// assert_eq!(PublicationStatus::parse("???"), PublicationStatus::Unknown);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ongoing" | "publishing" | "releasing" => PublicationStatus::Ongoing,
            "completed" | "finished" | "complete" => PublicationStatus::Completed,
            "hiatus" | "on hiatus" | "on_hiatus" => PublicationStatus::Hiatus,
            "cancelled" | "canceled" | "discontinued" => PublicationStatus::Cancelled,
            _ => PublicationStatus::Unknown,
        }
    }
}

/// A content entry as returned by a provider listing.
///
/// This is the unit of aggregation: every search, latest, or popular listing
/// yields these. The `source_id` back-reference identifies which provider
/// produced the item and is stamped by the aggregation layer.
///
/// # Examples
///
/// ```rust
/// use hondana::types::{ContentItem, PublicationStatus};
///
/// let item = ContentItem {
///     id: "123".to_string(),
///     title: "One Piece".to_string(),
///     cover_url: Some("https://example.com/cover.jpg".to_string()),
///     url: Some("https://example.com/title/123".to_string()),
///     status: PublicationStatus::Ongoing,
///     rating: None,
///     genres: vec!["Action".to_string()],
///     source_id: "mangadex".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier within the source.
    pub id: String,

    /// Main title.
    pub title: String,

    /// Cover image URL.
    pub cover_url: Option<String>,

    /// Canonical URL of the content on the provider, if any.
    pub url: Option<String>,

    /// Publication status.
    #[serde(default)]
    pub status: PublicationStatus,

    /// Provider rating, normalized to 0..=10 where available.
    pub rating: Option<f32>,

    /// Genre tags.
    #[serde(default)]
    pub genres: Vec<String>,

    /// Source identifier this item came from.
    pub source_id: String,
}

/// Full content description, a strict superset of [`ContentItem`].
///
/// Returned by detail lookups only; listings return the lighter
/// [`ContentItem`]. The embedded item is serialized flat, so a detail
/// document deserializes anywhere an item does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDetail {
    /// The listing-level fields.
    #[serde(flatten)]
    pub item: ContentItem,

    /// Description/summary.
    pub description: Option<String>,

    /// Alternate titles in other languages.
    #[serde(default)]
    pub alt_titles: Vec<String>,

    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Artist names, when distinct from authors.
    #[serde(default)]
    pub artists: Vec<String>,

    /// Fine-grained tags beyond the item's genres.
    #[serde(default)]
    pub tags: Vec<String>,

    /// When the provider last updated this entry.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single chapter (or episode) of a piece of content.
///
/// The chapter number can be decimal to support special chapters like
/// "Chapter 5.5". Lists are ordered ascending by number, ties broken by
/// volume, then by stable insertion order — see [`Chapter::ordering`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Unique identifier within the source.
    pub id: String,

    /// Associated content ID.
    pub content_id: String,

    /// Chapter number (can be decimal for .5 chapters).
    pub number: f64,

    /// Volume number, when the provider exposes one.
    pub volume: Option<f64>,

    /// Chapter title.
    pub title: String,

    /// Translation language, when known.
    pub language: Option<String>,

    /// Publish date, when the provider exposes one.
    pub published_at: Option<DateTime<Utc>>,

    /// Source identifier.
    pub source_id: String,
}

impl Chapter {
    /// Comparison function for chapter lists: ascending by number, ties
    /// broken by volume. Use with a stable sort so insertion order decides
    /// remaining ties.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hondana::types::Chapter;
    /// # fn chapter(number: f64, volume: Option<f64>) -> Chapter {
    /// #     Chapter {
    /// #         id: String::new(), content_id: String::new(), number, volume,
    /// #         title: String::new(), language: None, published_at: None,
    /// #         source_id: String::new(),
    /// #     }
    /// # }
    /// let mut chapters = vec![chapter(2.0, None), chapter(1.0, Some(1.0))];
    /// chapters.sort_by(Chapter::ordering);
    /// assert_eq!(chapters[0].number, 1.0);
    /// ```
    pub fn ordering(a: &Chapter, b: &Chapter) -> std::cmp::Ordering {
        a.number
            .partial_cmp(&b.number)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| match (a.volume, b.volume) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                _ => std::cmp::Ordering::Equal,
            })
    }
}

/// A renderable page within a chapter.
///
/// Pages are ordered by `index` starting at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// 0-based position within the chapter.
    pub index: u32,

    /// Image URL (or local path for filesystem sources).
    pub url: String,

    /// Reduced-quality fallback URL, when the provider offers one.
    pub data_saver_url: Option<String>,
}

/// One page of a paginated listing.
///
/// Pagination is 1-based: the first page of results has `current_page == 1`.
///
/// # Examples
///
/// ```rust
/// use hondana::types::ContentPage;
///
/// let page: ContentPage<u32> = ContentPage {
///     items: vec![1, 2, 3],
///     has_next_page: true,
///     current_page: 1,
/// };
/// assert_eq!(page.items.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPage<T> {
    /// The items on this page, in the source's natural order.
    pub items: Vec<T>,

    /// Whether requesting `current_page + 1` would yield more items.
    pub has_next_page: bool,

    /// The 1-based page this result represents.
    pub current_page: u32,
}

impl<T> ContentPage<T> {
    /// An empty page with no continuation.
    pub fn empty(current_page: u32) -> Self {
        Self {
            items: Vec::new(),
            has_next_page: false,
            current_page,
        }
    }
}

/// Search parameters for querying content across sources.
///
/// Uses the builder pattern (via `derive_builder`) for fluent construction.
/// An empty `source_ids` allow-list means "all enabled sources".
///
/// # Builder Usage
///
/// ```rust
/// use hondana::types::{SearchFiltersBuilder, SortOrder};
///
/// let filters = SearchFiltersBuilder::default()
///     .query("one piece")
///     .include_genres(vec!["Action".to_string()])
///     .sort_by(Some(SortOrder::UpdatedAt))
///     .build()
///     .unwrap();
///
/// assert_eq!(filters.query, "one piece");
/// ```
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into))]
pub struct SearchFilters {
    /// Free-text query. May be empty only when targeting sources that
    /// advertise LATEST or POPULAR as an alternative entry point.
    pub query: String,

    /// Only include content carrying all of these genres.
    #[builder(default)]
    pub include_genres: Vec<String>,

    /// Exclude content carrying any of these genres.
    #[builder(default)]
    pub exclude_genres: Vec<String>,

    /// Only include content with exactly this status.
    #[builder(default)]
    pub status: Option<PublicationStatus>,

    /// Restrict to sources serving this language.
    #[builder(default)]
    pub language: Option<String>,

    /// Explicit source allow-list; empty means all enabled sources.
    #[builder(default)]
    pub source_ids: Vec<String>,

    /// Requested result ordering.
    #[builder(default)]
    pub sort_by: Option<SortOrder>,
}

/// Defines how listing results should be ordered.
///
/// Not all sources support all orderings; unsupported values are ignored by
/// the source rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
    UpdatedAt,
    CreatedAt,
    Popularity,
    Title,
}

impl From<String> for SearchFilters {
    /// Creates search filters from a bare query string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::types::SearchFilters;
    ///
    /// let filters: SearchFilters = "one piece".to_string().into();
    /// assert_eq!(filters.query, "one piece");
    /// assert!(filters.source_ids.is_empty());
    /// ```
    fn from(query: String) -> Self {
        SearchFilters {
            query,
            ..Default::default()
        }
    }
}

impl From<&str> for SearchFilters {
    /// Creates search filters from a string slice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::types::SearchFilters;
    ///
    /// let filters: SearchFilters = "naruto".into();
    /// assert_eq!(filters.query, "naruto");
    /// ```
    fn from(query: &str) -> Self {
        SearchFilters {
            query: query.to_string(),
            ..Default::default()
        }
    }
}

/// A single hit in an aggregate search, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The content entry.
    pub item: ContentItem,

    /// Identifier of the producing source.
    pub source_id: String,

    /// Display name of the producing source.
    pub source_name: String,
}

/// The merged output of one aggregate query.
///
/// Results are grouped by source id; sources that contributed nothing
/// (error, timeout, or genuinely empty) are absent from the map. An
/// aggregate where every source failed is still a success with an empty
/// map — partial failure never escalates to a top-level error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedSearchResults {
    /// Per-source hits, each list in that source's natural order.
    pub results: HashMap<String, Vec<SearchResult>>,

    /// Sum of all per-source contribution lengths.
    pub total_count: usize,

    /// Whether a further page is worth requesting.
    pub has_more: bool,
}

impl GroupedSearchResults {
    /// An immediately-resolved empty result (count 0, no continuation).
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` when no source contributed anything.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The contributing source ids, sorted for deterministic output.
    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.results.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Flattens the per-source lists into one vector, grouped by source id
    /// in sorted order with each source's items in their original order.
    pub fn flatten(mut self) -> Vec<SearchResult> {
        let mut ids: Vec<String> = self.results.keys().cloned().collect();
        ids.sort_unstable();

        let mut flat = Vec::with_capacity(self.total_count);
        for id in ids {
            if let Some(mut hits) = self.results.remove(&id) {
                flat.append(&mut hits);
            }
        }
        flat
    }
}

/// The interaction style of a [`SourceFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Pick exactly one option.
    Select,
    /// Pick any number of options.
    MultiSelect,
    /// On/off switch.
    Toggle,
    /// Free-form text.
    Text,
}

/// A declarative browse filter a source exposes via
/// [`Source::get_filters`](crate::source::Source::get_filters).
///
/// The `id` doubles as the key callers pass back through `browse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFilter {
    /// Stable key for this filter.
    pub id: String,

    /// Human-readable label.
    pub label: String,

    /// Interaction style.
    pub kind: FilterKind,

    /// Legal values for select-style filters; empty for toggles and text.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Metadata for a dynamically loaded source extension.
///
/// Recorded by the extension loader when a candidate passes validation and
/// registration; dropped again on uninstall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    /// Package identifier (the manifest file stem).
    pub package: String,

    /// Declared entry-point name resolved by the host.
    pub entry_point: String,

    /// Declared semantic version.
    pub version: Version,

    /// The source id the instance registered under.
    pub source_id: String,

    /// Whether the source currently participates in aggregation.
    pub enabled: bool,

    /// Official/trusted extensions register enabled by default.
    pub official: bool,

    /// Optional icon for management UIs.
    pub icon_url: Option<String>,

    /// Optional short description.
    pub description: Option<String>,
}
