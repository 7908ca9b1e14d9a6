//! Network utilities for HTTP requests, rate limiting, and content parsing.
//!
//! This module provides the networking infrastructure for Hondana, including:
//!
//! - **HTTP Client**: A global, configured HTTP client with connection pooling
//! - **Rate Limiting**: Per-source rate limiting to respect website policies
//! - **Retry Logic**: Automatic retries with exponential backoff
//! - **Content Parsing**: HTML and JSON parsing utilities
//!
//! # Examples
//!
//! ```rust
//! use hondana::net::HttpClient;
//!
//! # async fn example() -> hondana::Result<()> {
//! let client = HttpClient::new("my_source")
//!     .with_rate_limit(500)  // 500ms between requests
//!     .with_max_retries(3);
//!
//! let html = client.get_text("https://example.com").await?;
//! let json: serde_json::Value = client.get_json("https://api.example.com").await?;
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use reqwest::{Client, header::HeaderMap};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

pub mod html;
pub mod json;

/// Global HTTP client instance with optimized configuration.
///
/// This client is configured with:
/// - 30-second timeout
/// - Connection pooling (10 idle connections per host)
/// - Compression support (gzip, brotli)
/// - Custom User-Agent header
///
/// The client is created lazily on first use and reused across all HTTP operations.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Hondana/0.1.0")
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
        .expect("Failed to build HTTP client")
});

/// A snapshot of one source's rate-limit bookkeeping.
///
/// Returned by [`RateLimiter::state`]. `last_dispatch` is the most recently
/// reserved dispatch slot, which may still lie in the future while a caller
/// is waiting on it.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitState {
    /// The most recently reserved dispatch time for this source.
    pub last_dispatch: Instant,

    /// The interval the limiter applies when none is supplied per call.
    pub min_interval: Duration,
}

/// Per-source rate limiter that spaces out requests to each provider.
///
/// Every acquisition atomically reserves the next dispatch slot for its
/// source: under the lock, the slot is computed as the later of "now" and
/// "previous slot + interval", recorded, and only then awaited. Because the
/// slot is claimed before sleeping, any number of concurrent callers for the
/// same source serialize onto slots at least one interval apart, and a
/// caller that is cancelled mid-wait still leaves its reservation behind.
///
/// Different sources never delay one another.
///
/// # Thread Safety
///
/// The rate limiter uses a `Mutex` internally (never held across an await)
/// and is safe to share across threads and async tasks.
#[derive(Debug)]
pub struct RateLimiter {
    slots: Mutex<HashMap<String, Instant>>,
    default_interval: Duration,
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            default_interval: self.default_interval,
        }
    }
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified default interval.
    ///
    /// # Parameters
    ///
    /// * `interval_ms` - Minimum delay between requests in milliseconds
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::RateLimiter;
    ///
    /// // Create a rate limiter with 500ms spacing
    /// let limiter = RateLimiter::new(500);
    /// ```
    pub fn new(interval_ms: u64) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            default_interval: Duration::from_millis(interval_ms),
        }
    }

    /// Reserves the next dispatch slot for `source_id` and waits until it
    /// arrives.
    ///
    /// Returns once the caller is clear to send. Two concurrent calls for
    /// the same source are guaranteed to return at least the configured
    /// interval apart.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::RateLimiter;
    ///
    /// # async fn example() {
    /// let limiter = RateLimiter::new(1000); // 1 second spacing
    /// limiter.acquire("mangadex").await; // Will wait if needed
    /// # }
    /// ```
    pub async fn acquire(&self, source_id: &str) {
        self.acquire_with(source_id, self.default_interval).await;
    }

    /// Reserves a dispatch slot using a custom interval for this source.
    ///
    /// Useful when a source declares its own
    /// [`min_interval`](crate::source::Source::min_interval) that differs
    /// from the limiter's default.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::RateLimiter;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let limiter = RateLimiter::new(500);
    /// // Use a longer interval for a stricter source
    /// limiter.acquire_with("slow_source", Duration::from_secs(2)).await;
    /// # }
    /// ```
    pub async fn acquire_with(&self, source_id: &str, interval: Duration) {
        let reserved = {
            let mut slots = self.slots.lock();
            let now = Instant::now();
            let slot = match slots.get(source_id) {
                Some(&last) => (last + interval).max(now),
                None => now,
            };
            slots.insert(source_id.to_string(), slot);
            slot
        };

        tokio::time::sleep_until(reserved).await;
    }

    /// Returns the current bookkeeping for a source, if it has ever been
    /// acquired through this limiter.
    pub fn state(&self, source_id: &str) -> Option<RateLimitState> {
        self.slots
            .lock()
            .get(source_id)
            .map(|&last_dispatch| RateLimitState {
                last_dispatch,
                min_interval: self.default_interval,
            })
    }
}

/// HTTP client wrapper with built-in rate limiting and retry logic.
///
/// `HttpClient` provides a high-level interface for making HTTP requests with
/// automatic rate limiting, retries, and error handling. Each client is associated
/// with a specific source and applies rate limiting per-source.
///
/// # Features
///
/// - **Rate Limiting**: Automatic spacing between requests
/// - **Retry Logic**: Exponential backoff for failed requests
/// - **Error Handling**: Comprehensive error types with context
/// - **Content Types**: Built-in support for text and JSON responses
///
/// # Examples
///
/// ```rust
/// use hondana::net::HttpClient;
///
/// # async fn example() -> hondana::Result<()> {
/// let client = HttpClient::new("mangadex")
///     .with_rate_limit(1000)  // 1 second between requests
///     .with_max_retries(5);   // Retry up to 5 times
///
/// let html = client.get_text("https://mangadex.org/title/123").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    source_id: String,
    rate_limiter: RateLimiter,
    max_retries: u32,
    headers: HeaderMap,
}

impl HttpClient {
    /// Creates a new HTTP client for the specified source.
    ///
    /// The client is initialized with sensible defaults:
    /// - 200ms rate limit spacing
    /// - 3 maximum retries
    ///
    /// # Parameters
    ///
    /// * `source_id` - Identifier for the source (used for rate limiting)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    ///
    /// let client = HttpClient::new("my_content_source");
    /// ```
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            rate_limiter: RateLimiter::new(200), // 200ms default
            max_retries: 3,
            headers: HeaderMap::new(),
        }
    }

    /// Sets the rate limit interval for this client.
    ///
    /// # Parameters
    ///
    /// * `interval_ms` - Minimum delay between requests in milliseconds
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    ///
    /// let client = HttpClient::new("source")
    ///     .with_rate_limit(1000); // 1 second between requests
    /// ```
    pub fn with_rate_limit(mut self, interval_ms: u64) -> Self {
        self.rate_limiter = RateLimiter::new(interval_ms);
        self
    }

    /// Sets the maximum number of retries for failed requests.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    ///
    /// let client = HttpClient::new("source")
    ///     .with_max_retries(5); // Retry up to 5 times
    /// ```
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Adds a custom header to all requests made by this client.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    ///
    /// let client = HttpClient::new("source")
    ///     .with_header("Referer", "https://example.com");
    /// ```
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<reqwest::header::HeaderName>(),
            value.parse::<reqwest::header::HeaderValue>(),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Performs a GET request with automatic retry logic and rate limiting.
    ///
    /// This method applies rate limiting, handles HTTP errors, and retries failed
    /// requests with exponential backoff. It handles 429 (Too Many Requests) responses
    /// specially by respecting the `Retry-After` header, and maps 404 responses to
    /// [`Error::NotFound`](crate::Error::NotFound) so sources can surface missing
    /// content without inspecting status codes themselves.
    ///
    /// # Returns
    ///
    /// The response body as `Bytes` on success.
    ///
    /// # Errors
    ///
    /// * [`Error::RateLimit`](crate::Error::RateLimit) - If rate limited after retries
    /// * [`Error::NotFound`](crate::Error::NotFound) - For 404 responses
    /// * [`Error::RemoteFailure`](crate::Error::RemoteFailure) - For other HTTP errors (4xx, 5xx)
    /// * [`Error::Network`](crate::Error::Network) - For network/connection errors
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    ///
    /// # async fn example() -> hondana::Result<()> {
    /// let client = HttpClient::new("source");
    /// let response = client.get("https://example.com/api/title/123").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, url: &str) -> crate::Result<Bytes> {
        let mut attempts = 0;

        loop {
            // Apply rate limiting
            self.rate_limiter.acquire(&self.source_id).await;

            match CLIENT.get(url).headers(self.headers.clone()).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response.bytes().await?);
                    }

                    if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(crate::Error::not_found(url));
                    }

                    // Handle rate limiting
                    if response.status() == 429 {
                        if attempts < self.max_retries {
                            attempts += 1;
                            let delay = Duration::from_secs(2_u64.pow(attempts));
                            tokio::time::sleep(delay).await;
                            continue;
                        }

                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok());

                        return Err(crate::Error::rate_limit(retry_after));
                    }

                    // Other HTTP errors
                    return Err(crate::Error::remote(
                        &self.source_id,
                        format!("HTTP {}", response.status()),
                    ));
                }
                Err(e) => {
                    if attempts < self.max_retries {
                        attempts += 1;
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Performs a GET request and returns the response as a UTF-8 string.
    ///
    /// This is a convenience method that calls [`get()`](HttpClient::get) and converts
    /// the response bytes to a string.
    ///
    /// # Errors
    ///
    /// * All errors from [`get()`](HttpClient::get)
    /// * [`Error::Parse`](crate::Error::Parse) - If the response is not valid UTF-8
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    ///
    /// # async fn example() -> hondana::Result<()> {
    /// let client = HttpClient::new("source");
    /// let html = client.get_text("https://example.com/title/123").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_text(&self, url: &str) -> crate::Result<String> {
        let bytes = self.get(url).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| crate::Error::parse(format!("Invalid UTF-8: {}", e)))
    }

    /// Performs a GET request and deserializes the response as JSON.
    ///
    /// This is a convenience method that calls [`get()`](HttpClient::get) and
    /// deserializes the response bytes as JSON using serde.
    ///
    /// # Errors
    ///
    /// * All errors from [`get()`](HttpClient::get)
    /// * [`Error::Json`](crate::Error::Json) - If JSON parsing fails
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::net::HttpClient;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct ApiResponse {
    ///     title: String,
    ///     chapters: Vec<String>,
    /// }
    ///
    /// # async fn example() -> hondana::Result<()> {
    /// let client = HttpClient::new("source");
    /// let data: ApiResponse = client.get_json("https://api.example.com/title/123").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_json<T>(&self, url: &str) -> crate::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.get(url).await?;
        serde_json::from_slice(&bytes).map_err(Into::into)
    }
}
