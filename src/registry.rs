//! Registry of installed sources with enable/disable state.
//!
//! The [`SourceRegistry`] is the single registration table for every source
//! the engine knows about, whether compiled in or installed at runtime by
//! the [`ExtensionLoader`](crate::extension::ExtensionLoader). Entries are
//! keyed by source id; registering a second source under an existing id is
//! rejected rather than silently replacing the first.
//!
//! Read operations hand out snapshots: the returned vectors hold cloned
//! `Arc` handles, so a snapshot taken before a mutation still sees the old
//! set while new readers see the new one. Callers iterating a snapshot are
//! never invalidated mid-iteration.
//!
//! # Examples
//!
//! ```rust
//! # use async_trait::async_trait;
//! # use hondana::error::Result;
//! # use hondana::prelude::*;
//! # use std::sync::Arc;
//! # struct Demo;
//! # #[async_trait]
//! # impl Source for Demo {
//! #     fn id(&self) -> &str { "demo" }
//! #     fn name(&self) -> &str { "Demo" }
//! #     fn base_url(&self) -> &str { "https://demo.example" }
//! #     fn capabilities(&self) -> &[Capability] { &[Capability::Search] }
//! #     async fn search(&self, _q: &str, page: u32, _f: &SearchFilters) -> Result<ContentPage<ContentItem>> { Ok(ContentPage::empty(page)) }
//! #     async fn get_content_details(&self, id: &str) -> Result<ContentDetail> { Err(hondana::Error::not_found(id)) }
//! #     async fn get_chapter_list(&self, _id: &str) -> Result<Vec<Chapter>> { Ok(vec![]) }
//! #     async fn get_page_list(&self, _id: &str) -> Result<Vec<PageImage>> { Ok(vec![]) }
//! # }
//! let registry = SourceRegistry::new();
//! registry.register(Arc::new(Demo)).unwrap();
//!
//! assert_eq!(registry.len(), 1);
//! assert_eq!(registry.is_enabled("demo"), Some(true));
//!
//! registry.set_enabled("demo", false).unwrap();
//! assert!(registry.get_enabled().is_empty());
//! assert!(registry.get_by_id("demo").is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::{
    error::{Error, Result},
    source::Source,
    types::SourceDescriptor,
};

struct RegisteredSource {
    source: Arc<dyn Source>,
    enabled: bool,
}

/// Thread-safe registration table for content sources.
///
/// All methods take `&self`; interior mutability is handled by an `RwLock`
/// so the registry can be shared as `Arc<SourceRegistry>` between the
/// extension loader, the aggregator, and application code.
pub struct SourceRegistry {
    entries: RwLock<HashMap<String, RegisteredSource>>,
}

impl SourceRegistry {
    /// Creates a new empty registry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::registry::SourceRegistry;
    ///
    /// let registry = SourceRegistry::new();
    /// assert!(registry.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a source, enabled by default.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateSourceId`] if a source with the same id is already
    /// registered. The existing registration is left untouched, including
    /// its enabled flag.
    pub fn register(&self, source: Arc<dyn Source>) -> Result<()> {
        self.register_with(source, true)
    }

    /// Registers a source with an explicit initial enabled flag.
    ///
    /// The extension loader uses this to install unofficial extensions in a
    /// disabled state, leaving the opt-in to the user.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateSourceId`] if the id is already taken.
    pub fn register_with(&self, source: Arc<dyn Source>, enabled: bool) -> Result<()> {
        let id = source.id().to_string();
        let mut entries = self.entries.write();

        if entries.contains_key(&id) {
            return Err(Error::DuplicateSourceId(id));
        }

        info!("Registered source '{}' (enabled: {})", id, enabled);
        entries.insert(id, RegisteredSource { source, enabled });
        Ok(())
    }

    /// Removes a source from the registry and returns its handle.
    ///
    /// Outstanding clones of the `Arc` stay valid; only the registration
    /// disappears.
    ///
    /// # Errors
    ///
    /// [`Error::SourceNotFound`] if no source has this id.
    pub fn unregister(&self, id: &str) -> Result<Arc<dyn Source>> {
        let removed = self.entries.write().remove(id);
        match removed {
            Some(entry) => {
                info!("Unregistered source '{}'", id);
                Ok(entry.source)
            }
            None => Err(Error::SourceNotFound(id.to_string())),
        }
    }

    /// Enables or disables a source without destroying it.
    ///
    /// Disabled sources are skipped by aggregation but remain resolvable
    /// through [`get_by_id`](SourceRegistry::get_by_id). Setting the flag
    /// to its current value is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::SourceNotFound`] if no source has this id.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                Ok(())
            }
            None => Err(Error::SourceNotFound(id.to_string())),
        }
    }

    /// Returns the enabled flag of a source, or `None` when unregistered.
    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entries.read().get(id).map(|entry| entry.enabled)
    }

    /// Looks up a source by id, enabled or not.
    pub fn get_by_id(&self, id: &str) -> Option<Arc<dyn Source>> {
        self.entries.read().get(id).map(|entry| entry.source.clone())
    }

    /// Snapshot of all registered sources, sorted by id.
    ///
    /// Two snapshots taken with no interleaving mutation are identical.
    pub fn get_all(&self) -> Vec<Arc<dyn Source>> {
        let mut sources: Vec<Arc<dyn Source>> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.source.clone())
            .collect();
        sources.sort_by(|a, b| a.id().cmp(b.id()));
        sources
    }

    /// Snapshot of the enabled sources only, sorted by id.
    ///
    /// This is the set the aggregator fans out to.
    pub fn get_enabled(&self) -> Vec<Arc<dyn Source>> {
        let mut sources: Vec<Arc<dyn Source>> = self
            .entries
            .read()
            .values()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.source.clone())
            .collect();
        sources.sort_by(|a, b| a.id().cmp(b.id()));
        sources
    }

    /// Descriptor snapshots for every registered source, sorted by id.
    ///
    /// Useful for management UIs that list sources without holding live
    /// handles.
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        let mut descriptors: Vec<SourceDescriptor> = self
            .entries
            .read()
            .values()
            .map(|entry| SourceDescriptor::from_source(entry.source.as_ref(), entry.enabled))
            .collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    /// Returns the number of registered sources, enabled or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut ids: Vec<&str> = entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("SourceRegistry").field("ids", &ids).finish()
    }
}
