//! Concurrent query aggregation across every enabled source.
//!
//! The [`SearchAggregator`] fans one query out to the enabled sources in a
//! [`SourceRegistry`](crate::registry::SourceRegistry), runs the branches
//! concurrently under a shared [`RateLimiter`](crate::net::RateLimiter),
//! and merges whatever comes back into [`GroupedSearchResults`]. A slow or
//! broken source costs its own contribution and nothing else: branch
//! failures and timeouts are logged and dropped, never propagated.
//!
//! Issuing a new query supersedes any query still in flight. In-flight
//! branches stop cooperatively and the superseded call returns
//! [`Error::Cancelled`], so results from an abandoned query are never
//! delivered.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use hondana::aggregator::SearchAggregator;
//! use hondana::registry::SourceRegistry;
//! use hondana::types::SearchFilters;
//!
//! # async fn example() -> hondana::Result<()> {
//! let registry = Arc::new(SourceRegistry::new());
//! // registry.register(Arc::new(MangaDexSource::new()))?;
//!
//! let aggregator = SearchAggregator::new(registry);
//! let results = aggregator.search(&SearchFilters::from("one piece"), 1).await?;
//!
//! for (source_id, hits) in &results.results {
//!     println!("{}: {} hit(s)", source_id, hits.len());
//! }
//! println!("{} result(s) total", results.total_count);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    net::RateLimiter,
    registry::SourceRegistry,
    source::Source,
    types::{
        Capability, ContentItem, ContentPage, GroupedSearchResults, SearchFilters, SearchResult,
    },
};

const DEFAULT_BRANCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Total-count threshold above which an aggregate reports `has_more` even
/// when no single source did.
const MORE_RESULTS_THRESHOLD: usize = 20;

/// Lifecycle of one aggregate query as observed through a stream.
///
/// Streams returned by [`SearchAggregator::search_stream`] and friends emit
/// exactly two items: [`QueryState::Loading`] immediately, then exactly one
/// of [`QueryState::Ready`] or [`QueryState::Failed`].
#[derive(Debug)]
pub enum QueryState {
    /// The query has been dispatched and branches are running.
    Loading,
    /// The merged results. Partial failure still lands here; an aggregate
    /// where every source failed is `Ready` with an empty result set.
    Ready(GroupedSearchResults),
    /// The query as a whole failed (superseded by a newer query, or an
    /// engine-level error).
    Failed(Error),
}

impl QueryState {
    /// `true` for the initial [`QueryState::Loading`] event.
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }
}

#[derive(Debug, Clone, Copy)]
enum ListingOp {
    Search,
    Latest,
    Popular,
}

impl ListingOp {
    fn capability(self) -> Capability {
        match self {
            ListingOp::Search => Capability::Search,
            ListingOp::Latest => Capability::Latest,
            ListingOp::Popular => Capability::Popular,
        }
    }
}

/// Fans queries out to enabled sources and merges their results.
///
/// The aggregator owns no sources itself; it snapshots the enabled set from
/// its registry at the start of every query, so registrations and
/// enable/disable flips take effect on the next query without disturbing
/// one already in flight.
///
/// # Concurrency
///
/// At most [`with_max_concurrency`](SearchAggregator::with_max_concurrency)
/// branches run at once. Each branch first reserves a dispatch slot from
/// the shared per-source rate limiter, then gets
/// [`with_timeout`](SearchAggregator::with_timeout) to produce a result.
///
/// # Cancellation
///
/// Every query is stamped with a generation number. Starting a new query
/// (or calling [`cancel_search`](SearchAggregator::cancel_search)) bumps
/// the generation; branches of older generations stop at their next await
/// point and the superseded call returns [`Error::Cancelled`].
pub struct SearchAggregator {
    registry: Arc<SourceRegistry>,
    limiter: RateLimiter,
    branch_timeout: Duration,
    max_concurrency: usize,
    generation: AtomicU64,
    cancel_tx: watch::Sender<u64>,
}

impl SearchAggregator {
    /// Creates an aggregator over `registry` with default settings: a 10
    /// second branch timeout, at most 8 concurrent branches, and 200ms
    /// default rate-limit spacing.
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        let (cancel_tx, _) = watch::channel(0);
        Self {
            registry,
            limiter: RateLimiter::new(200),
            branch_timeout: DEFAULT_BRANCH_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            generation: AtomicU64::new(0),
            cancel_tx,
        }
    }

    /// Sets the per-branch timeout.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use std::time::Duration;
    /// use hondana::aggregator::SearchAggregator;
    /// # use hondana::registry::SourceRegistry;
    ///
    /// # let registry = Arc::new(SourceRegistry::new());
    /// let aggregator = SearchAggregator::new(registry)
    ///     .with_timeout(Duration::from_secs(5));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = timeout;
        self
    }

    /// Sets how many branches may run concurrently (minimum 1).
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Searches all eligible sources and merges the results.
    ///
    /// Eligible means: enabled in the registry, advertising
    /// [`Capability::Search`], matching `filters.language` when set, and
    /// listed in `filters.source_ids` when that allow-list is non-empty.
    /// An empty eligible set resolves immediately to an empty result.
    ///
    /// Genre and status filters are re-applied to every branch's items
    /// here, so sources that ignore them natively still produce correct
    /// aggregate output.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] when a newer query superseded this one. Branch
    /// failures never surface; a query where every source failed returns
    /// `Ok` with an empty result set.
    pub async fn search(
        &self,
        filters: &SearchFilters,
        page: u32,
    ) -> Result<GroupedSearchResults> {
        let mut sources = self.registry.get_enabled();
        if !filters.source_ids.is_empty() {
            sources.retain(|source| filters.source_ids.iter().any(|id| id == source.id()));
        }
        if let Some(language) = &filters.language {
            sources.retain(|source| source.language().eq_ignore_ascii_case(language));
        }
        self.aggregate(ListingOp::Search, sources, filters.clone(), page)
            .await
    }

    /// Merges the latest-updates listings of every enabled source that
    /// advertises [`Capability::Latest`].
    pub async fn get_latest(&self, page: u32) -> Result<GroupedSearchResults> {
        let sources = self.registry.get_enabled();
        self.aggregate(ListingOp::Latest, sources, SearchFilters::default(), page)
            .await
    }

    /// Merges the popularity listings of every enabled source that
    /// advertises [`Capability::Popular`].
    pub async fn get_popular(&self, page: u32) -> Result<GroupedSearchResults> {
        let sources = self.registry.get_enabled();
        self.aggregate(ListingOp::Popular, sources, SearchFilters::default(), page)
            .await
    }

    /// Searches one specific source directly, bypassing aggregation.
    ///
    /// Unlike the fan-out operations, errors propagate: the caller named
    /// the source, so its failure is the answer. Items come back stamped
    /// with the source's id.
    ///
    /// # Errors
    ///
    /// * [`Error::SourceNotFound`] - No source registered under `source_id`
    /// * [`Error::Timeout`] - The source exceeded the branch timeout
    /// * Any error the source itself returns
    pub async fn search_in_source(
        &self,
        source_id: &str,
        query: &str,
        page: u32,
    ) -> Result<ContentPage<ContentItem>> {
        let source = self
            .registry
            .get_by_id(source_id)
            .ok_or_else(|| Error::SourceNotFound(source_id.to_string()))?;

        self.limiter
            .acquire_with(source.id(), source.min_interval())
            .await;

        let filters = SearchFilters::from(query);
        let mut result_page = match timeout(
            self.branch_timeout,
            source.search(query, page, &filters),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(Error::timeout(source.id(), self.branch_timeout)),
        };

        for item in &mut result_page.items {
            item.source_id = source.id().to_string();
        }
        Ok(result_page)
    }

    /// Cancels whatever query is currently in flight.
    ///
    /// Fire-and-forget: the superseded call observes the bump and returns
    /// [`Error::Cancelled`]. Calling this with nothing in flight is a
    /// no-op.
    pub fn cancel_search(&self) {
        let generation = self.next_generation();
        debug!("Cancelling in-flight queries (generation {})", generation);
    }

    /// Runs [`search`](SearchAggregator::search) as a two-event stream:
    /// [`QueryState::Loading`] immediately, then exactly one terminal
    /// [`QueryState::Ready`] or [`QueryState::Failed`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// use futures::StreamExt;
    /// use hondana::aggregator::{QueryState, SearchAggregator};
    /// # use hondana::registry::SourceRegistry;
    /// use hondana::types::SearchFilters;
    ///
    /// # async fn example() {
    /// # let aggregator = SearchAggregator::new(Arc::new(SourceRegistry::new()));
    /// let stream = aggregator.search_stream(SearchFilters::from("one piece"), 1);
    /// futures::pin_mut!(stream);
    ///
    /// while let Some(state) = stream.next().await {
    ///     match state {
    ///         QueryState::Loading => println!("searching..."),
    ///         QueryState::Ready(results) => println!("{} result(s)", results.total_count),
    ///         QueryState::Failed(e) => println!("query failed: {}", e),
    ///     }
    /// }
    /// # }
    /// ```
    pub fn search_stream(
        &self,
        filters: SearchFilters,
        page: u32,
    ) -> impl Stream<Item = QueryState> + '_ {
        stream::once(async { QueryState::Loading }).chain(stream::once(async move {
            match self.search(&filters, page).await {
                Ok(results) => QueryState::Ready(results),
                Err(e) => QueryState::Failed(e),
            }
        }))
    }

    /// Streaming variant of [`get_latest`](SearchAggregator::get_latest).
    pub fn latest_stream(&self, page: u32) -> impl Stream<Item = QueryState> + '_ {
        stream::once(async { QueryState::Loading }).chain(stream::once(async move {
            match self.get_latest(page).await {
                Ok(results) => QueryState::Ready(results),
                Err(e) => QueryState::Failed(e),
            }
        }))
    }

    /// Streaming variant of [`get_popular`](SearchAggregator::get_popular).
    pub fn popular_stream(&self, page: u32) -> impl Stream<Item = QueryState> + '_ {
        stream::once(async { QueryState::Loading }).chain(stream::once(async move {
            match self.get_popular(page).await {
                Ok(results) => QueryState::Ready(results),
                Err(e) => QueryState::Failed(e),
            }
        }))
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_tx.send_replace(generation);
        generation
    }

    async fn aggregate(
        &self,
        op: ListingOp,
        mut sources: Vec<Arc<dyn Source>>,
        filters: SearchFilters,
        page: u32,
    ) -> Result<GroupedSearchResults> {
        // This query supersedes anything still in flight, even if it ends
        // up targeting no sources at all.
        let generation = self.next_generation();

        sources.retain(|source| source.supports(op.capability()));
        if sources.is_empty() {
            return Ok(GroupedSearchResults::empty());
        }

        debug!(
            "Dispatching {:?} (generation {}) to {} source(s)",
            op,
            generation,
            sources.len()
        );

        let filters = Arc::new(filters);
        let branches: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let filters = Arc::clone(&filters);
                let mut cancel_rx = self.cancel_tx.subscribe();
                async move {
                    let outcome = tokio::select! {
                        result = self.run_branch(op, &source, &filters, page) => result,
                        _ = superseded(&mut cancel_rx, generation) => Err(Error::Cancelled),
                    };
                    (source, outcome)
                }
            })
            .collect();

        let mut merged = stream::iter(branches).buffer_unordered(self.max_concurrency);

        let mut grouped = GroupedSearchResults::empty();
        while let Some((source, outcome)) = merged.next().await {
            match outcome {
                Ok(result_page) => {
                    grouped.has_more |= result_page.has_next_page;
                    let hits = collect_hits(source.as_ref(), result_page.items, &filters);
                    if !hits.is_empty() {
                        grouped.total_count += hits.len();
                        grouped.results.insert(source.id().to_string(), hits);
                    }
                }
                Err(Error::Cancelled) => {
                    debug!("Branch for '{}' cancelled", source.id());
                }
                Err(e) => {
                    warn!("Source '{}' contributed nothing: {}", source.id(), e);
                }
            }
        }

        grouped.has_more = grouped.has_more || grouped.total_count >= MORE_RESULTS_THRESHOLD;

        // A newer query may have superseded this one while results were
        // being merged; its output must not reach the caller.
        if *self.cancel_tx.borrow() != generation {
            return Err(Error::Cancelled);
        }

        Ok(grouped)
    }

    async fn run_branch(
        &self,
        op: ListingOp,
        source: &Arc<dyn Source>,
        filters: &SearchFilters,
        page: u32,
    ) -> Result<ContentPage<ContentItem>> {
        // The rate-limit wait is engine-imposed queueing, so the branch
        // timeout only starts once the source is clear to dispatch.
        self.limiter
            .acquire_with(source.id(), source.min_interval())
            .await;

        let work = async {
            match op {
                ListingOp::Search => source.search(&filters.query, page, filters).await,
                ListingOp::Latest => source.get_latest(page).await,
                ListingOp::Popular => source.get_popular(page).await,
            }
        };

        match timeout(self.branch_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(source.id(), self.branch_timeout)),
        }
    }
}

impl std::fmt::Debug for SearchAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAggregator")
            .field("branch_timeout", &self.branch_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

/// Resolves once the current generation moves past `generation`.
async fn superseded(rx: &mut watch::Receiver<u64>, generation: u64) {
    loop {
        if *rx.borrow_and_update() != generation {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: no newer query can ever supersede this one.
            futures::future::pending::<()>().await;
        }
    }
}

fn collect_hits(
    source: &dyn Source,
    items: Vec<ContentItem>,
    filters: &SearchFilters,
) -> Vec<SearchResult> {
    items
        .into_iter()
        .filter(|item| matches_filters(item, filters))
        .map(|mut item| {
            item.source_id = source.id().to_string();
            SearchResult {
                item,
                source_id: source.id().to_string(),
                source_name: source.name().to_string(),
            }
        })
        .collect()
}

fn matches_filters(item: &ContentItem, filters: &SearchFilters) -> bool {
    if let Some(status) = filters.status {
        if item.status != status {
            return false;
        }
    }

    if !filters.include_genres.is_empty() {
        let all_present = filters
            .include_genres
            .iter()
            .all(|wanted| item.genres.iter().any(|g| g.eq_ignore_ascii_case(wanted)));
        if !all_present {
            return false;
        }
    }

    if filters
        .exclude_genres
        .iter()
        .any(|banned| item.genres.iter().any(|g| g.eq_ignore_ascii_case(banned)))
    {
        return false;
    }

    true
}

/// Convenience transforms over flattened aggregate results.
///
/// Mirrors the fluent style of the rest of the crate: each method consumes
/// and returns the vector so calls chain.
///
/// # Examples
///
/// ```rust
/// use hondana::aggregator::SearchResultsExt;
/// use hondana::types::{ContentItem, PublicationStatus, SearchResult};
///
/// # fn result(title: &str) -> SearchResult {
/// #     SearchResult {
/// #         item: ContentItem {
/// #             id: title.to_string(), title: title.to_string(), cover_url: None,
/// #             url: None, status: PublicationStatus::Unknown, rating: None,
/// #             genres: vec![], source_id: "a".to_string(),
/// #         },
/// #         source_id: "a".to_string(),
/// #         source_name: "A".to_string(),
/// #     }
/// # }
/// let results = vec![result("Naruto"), result("naruto"), result("Bleach")];
/// let deduped = results.dedupe_by_title().sort_by_title();
///
/// assert_eq!(deduped.len(), 2);
/// assert_eq!(deduped[0].item.title, "Bleach");
/// ```
pub trait SearchResultsExt {
    /// Removes case-insensitive duplicate titles, keeping first occurrence.
    fn dedupe_by_title(self) -> Self;

    /// Sorts alphabetically by title, case-insensitively.
    fn sort_by_title(self) -> Self;

    /// Keeps only results carrying `genre` (case-insensitive).
    fn filter_by_genre(self, genre: &str) -> Self;
}

impl SearchResultsExt for Vec<SearchResult> {
    fn dedupe_by_title(mut self) -> Self {
        let mut seen = HashSet::new();
        self.retain(|result| seen.insert(result.item.title.to_lowercase()));
        self
    }

    fn sort_by_title(mut self) -> Self {
        self.sort_by(|a, b| {
            a.item
                .title
                .to_lowercase()
                .cmp(&b.item.title.to_lowercase())
        });
        self
    }

    fn filter_by_genre(mut self, genre: &str) -> Self {
        self.retain(|result| {
            result
                .item
                .genres
                .iter()
                .any(|g| g.eq_ignore_ascii_case(genre))
        });
        self
    }
}
