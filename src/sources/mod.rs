//! Built-in source implementations with conditional compilation support.
//!
//! This module contains the source implementations compiled into the crate,
//! with individual sources protected by feature flags to allow for minimal
//! builds that only include the sources you need. Additional sources can be
//! installed at runtime through the
//! [`extension`](crate::extension) module without touching this list.
//!
//! # Feature Flags
//!
//! Each source is behind its own feature flag:
//! - `source-mangadex` - Enables the MangaDex source
//! - `source-local` - Enables the local filesystem source
//! - `source-madara` - Enables the Madara scraping template
//! - `all-sources` - Enables all sources (default)
//!
//! # Examples
//!
//! Build with only MangaDex support:
//! ```bash
//! cargo build --no-default-features --features source-mangadex
//! ```
//!
//! # Available Sources
//!
//! - [`MangaDexSource`] - MangaDex.org API source (requires `source-mangadex`)
//! - [`LocalSource`] - Directory-tree library source (requires `source-local`)
//! - [`MadaraSource`] - Configurable template for Madara theme sites, also
//!   the `"madara"` extension entry point (requires `source-madara`)

#[cfg(feature = "source-mangadex")]
pub mod mangadex;

#[cfg(feature = "source-local")]
pub mod local;

#[cfg(feature = "source-madara")]
pub mod madara;

#[cfg(feature = "source-mangadex")]
pub use mangadex::MangaDexSource;

#[cfg(feature = "source-local")]
pub use local::LocalSource;

#[cfg(feature = "source-madara")]
pub use madara::{MadaraConfig, MadaraSelectors, MadaraSource};
