//! Runtime discovery and installation of source extensions.
//!
//! Sources don't have to be compiled in. A directory of TOML manifests can
//! describe additional sources, each resolved against a named template the
//! host knows how to build. The [`ExtensionLoader`] scans that directory,
//! validates every candidate, and registers the survivors with the shared
//! [`SourceRegistry`](crate::registry::SourceRegistry).
//!
//! The pieces:
//!
//! - [`manifest`] - Manifest format and the two-step parse that separates
//!   "not an extension" from "broken extension"
//! - [`host`] - The [`ExtensionHost`] trait and the template-based
//!   [`TemplateHost`] implementation
//! - [`loader`] - The [`ExtensionLoader`] scan/uninstall/update logic
//!
//! A manifest looks like this:
//!
//! ```toml
//! source = true
//! id = "madara-demo"
//! name = "Demo Reader"
//! entry_point = "madara"
//! version = "1.2.0"
//! base_url = "https://demo.example"
//! language = "en"
//! official = false
//!
//! [config]
//! search_item = ".c-tabs-item__content"
//! ```
//!
//! Candidates are isolated from each other: one broken manifest is recorded
//! as rejected (with its reason) while its siblings still install.

pub mod host;
pub mod loader;
pub mod manifest;

pub use host::{ExtensionHost, SourceFactory, TemplateHost};
pub use loader::{ExtensionLoader, RejectedExtension, ScanReport, UpdateAvailable};
pub use manifest::{ExtensionManifest, parse_manifest};
