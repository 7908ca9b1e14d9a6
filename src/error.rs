//! Error types and result handling for discovery-engine operations.
//!
//! This module defines the error handling system used throughout Hondana.
//! All fallible operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! Errors fall into three broad groups with different propagation rules:
//!
//! - **Registry/Loader errors** ([`SourceNotFound`](Error::SourceNotFound),
//!   [`DuplicateSourceId`](Error::DuplicateSourceId),
//!   [`ContractMismatch`](Error::ContractMismatch)) indicate programmer or
//!   configuration mistakes and are surfaced directly to the caller.
//! - **Per-source errors** ([`RemoteFailure`](Error::RemoteFailure),
//!   [`Timeout`](Error::Timeout),
//!   [`CapabilityUnsupported`](Error::CapabilityUnsupported)) are isolated at
//!   the aggregation boundary — a failing source contributes nothing instead
//!   of failing the whole query.
//! - **Transport/format errors** ([`Network`](Error::Network),
//!   [`Parse`](Error::Parse), [`Json`](Error::Json), [`Io`](Error::Io)) wrap
//!   the underlying cause and bubble up through source implementations.
//!
//! # Examples
//!
//! ```rust
//! use hondana::error::{Error, Result};
//!
//! fn lookup(id: &str) -> Result<()> {
//!     if id.is_empty() {
//!         return Err(Error::SourceNotFound(id.to_string()));
//!     }
//!     Ok(())
//! }
//!
//! match lookup("") {
//!     Err(Error::SourceNotFound(id)) => println!("unknown source: {:?}", id),
//!     other => println!("{:?}", other),
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::types::Capability;

/// Type alias for Results with Hondana errors.
///
/// All public APIs in Hondana return this Result type.
///
/// # Examples
///
/// ```rust
/// use hondana::{Result, Error};
///
/// fn example_operation() -> Result<String> {
///     Ok("Success".to_string())
/// }
///
/// fn example_with_error() -> Result<()> {
///     Err(Error::parse("Something went wrong"))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all Hondana operations.
///
/// This enum covers the full taxonomy of failures the engine can produce,
/// from registry misuse to remote provider errors. Each variant carries the
/// context needed to act on it.
#[derive(Error, Debug)]
pub enum Error {
    /// Network-related errors from HTTP operations.
    ///
    /// Wraps errors from the underlying HTTP client (reqwest), including
    /// connection timeouts, DNS resolution failures, and TLS errors.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML/JSON parsing and data format errors.
    ///
    /// Used when received data cannot be interpreted as expected: malformed
    /// HTML, unexpected JSON structure, or missing required fields.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::parse("Missing title field in response");
    /// ```
    #[error("Parse error: {0}")]
    Parse(String),

    /// A remote provider failed while serving a request.
    ///
    /// Carries the identifier of the source that failed and a description of
    /// the underlying cause. Inside an aggregate search this error is
    /// confined to its branch; calling a source directly surfaces it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::remote("mangadex", "HTTP 503");
    /// ```
    #[error("Remote failure [{source_id}]: {message}")]
    RemoteFailure { source_id: String, message: String },

    /// An extension candidate does not satisfy the source contract.
    ///
    /// Produced at load time when an entry point cannot be resolved or the
    /// instantiated source fails validation. The candidate is rejected and
    /// never reaches the registry.
    #[error("Contract mismatch in extension '{extension}': {reason}")]
    ContractMismatch { extension: String, reason: String },

    /// An unknown `source_id` was referenced.
    ///
    /// Returned by registry and aggregator APIs when the caller names a
    /// source that was never registered (or has been unregistered).
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// A source with the same id is already registered.
    ///
    /// Registration never silently overwrites; the registry is left
    /// unchanged when this error is returned.
    #[error("Duplicate source id: {0}")]
    DuplicateSourceId(String),

    /// An operation was invoked on a source that does not advertise the
    /// required capability.
    ///
    /// Sources fail closed: calling `browse` on a source without
    /// [`Capability::BrowseFilters`] produces this error rather than a panic.
    #[error("Capability {capability} not supported by source '{source_id}'")]
    CapabilityUnsupported {
        source_id: String,
        capability: Capability,
    },

    /// A per-source call exceeded its deadline.
    ///
    /// Inside an aggregate search a timed-out branch is treated like a
    /// failed branch: it contributes nothing and does not fail the whole.
    #[error("Timeout [{source_id}]: no response within {after:?}")]
    Timeout { source_id: String, after: Duration },

    /// The operation was cooperatively cancelled.
    ///
    /// Produced when a newer aggregate query supersedes an in-flight one or
    /// when the caller cancels explicitly. Not a failure — cancelled
    /// branches are discarded without being logged as errors.
    #[error("Operation cancelled")]
    Cancelled,

    /// Resource not found errors.
    ///
    /// Used when a requested resource (content, chapter, file) cannot be
    /// found within a source.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::not_found("Content with ID 'invalid-id'");
    /// ```
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting responses from remote providers.
    ///
    /// Indicates the provider throttled the request. Optionally carries the
    /// wait in seconds from the provider's `Retry-After` header.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimit { retry_after: Option<u64> },

    /// File system and IO operation errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization and deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Extension manifest parsing errors.
    #[error("Manifest error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Semantic version parsing errors.
    #[error("Version error: {0}")]
    Semver(#[from] semver::Error),

    /// Generic error messages that fit no other category.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a parse error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::parse("Invalid content ID format");
    /// let error = Error::parse(format!("Expected {} chapters, found {}", 10, 5));
    /// ```
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Creates a remote failure error with source ID and message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::remote("mangadex", "API endpoint not found");
    /// ```
    pub fn remote(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::RemoteFailure {
            source_id: source.into(),
            message: msg.into(),
        }
    }

    /// Creates a contract mismatch error for a rejected extension.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::contract_mismatch("acme-manga", "unknown entry point 'acme'");
    /// ```
    pub fn contract_mismatch(extension: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ContractMismatch {
            extension: extension.into(),
            reason: reason.into(),
        }
    }

    /// Creates a capability error for an unsupported operation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    /// use hondana::types::Capability;
    ///
    /// let error = Error::capability("local", Capability::BrowseFilters);
    /// ```
    pub fn capability(source: impl Into<String>, capability: Capability) -> Self {
        Error::CapabilityUnsupported {
            source_id: source.into(),
            capability,
        }
    }

    /// Creates a timeout error for a source call that exceeded its deadline.
    pub fn timeout(source: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            source_id: source.into(),
            after,
        }
    }

    /// Creates a not found error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::not_found("Content with ID 'abc123'");
    /// ```
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a rate limit error with optional retry-after time.
    ///
    /// The retry-after parameter typically comes from the `Retry-After`
    /// HTTP header.
    pub fn rate_limit(retry_after: Option<u64>) -> Self {
        Error::RateLimit { retry_after }
    }

    /// Returns `true` for errors that an aggregate search isolates to a
    /// single branch instead of propagating.
    pub fn is_branch_error(&self) -> bool {
        matches!(
            self,
            Error::RemoteFailure { .. }
                | Error::Timeout { .. }
                | Error::CapabilityUnsupported { .. }
                | Error::Network(_)
                | Error::RateLimit { .. }
        )
    }
}
