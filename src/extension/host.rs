//! Hosts turn validated manifests into live source instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::source::Source;

use super::manifest::ExtensionManifest;

/// Factory function building a source from a manifest.
pub type SourceFactory = Box<dyn Fn(&ExtensionManifest) -> Result<Arc<dyn Source>> + Send + Sync>;

/// Resolves an extension manifest to a runnable [`Source`] instance.
///
/// The loader stays agnostic of how instances come to life; anything that
/// can map a manifest to a source (a template table, an embedded scripting
/// runtime, a test double) can be plugged in here.
pub trait ExtensionHost: Send + Sync {
    /// Builds the source a manifest describes.
    ///
    /// # Errors
    ///
    /// [`Error::ContractMismatch`] when the entry point is unknown or the
    /// manifest's configuration doesn't satisfy the template.
    fn instantiate(&self, manifest: &ExtensionManifest) -> Result<Arc<dyn Source>>;
}

/// [`ExtensionHost`] backed by a table of named source templates.
///
/// A template is a factory keyed by the manifest's `entry_point`. The
/// manifest supplies identity (id, name, base URL) and a free-form config
/// table; the template turns those into a concrete source.
///
/// # Examples
///
/// ```rust
/// use hondana::extension::TemplateHost;
///
/// let host = TemplateHost::with_builtin_templates();
/// assert!(host.has_template("madara") || host.template_names().is_empty());
/// ```
pub struct TemplateHost {
    factories: HashMap<String, SourceFactory>,
}

impl TemplateHost {
    /// Creates a host with no templates registered.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a host preloaded with the templates compiled into this
    /// build.
    pub fn with_builtin_templates() -> Self {
        #[allow(unused_mut)]
        let mut host = Self::new();

        #[cfg(feature = "source-madara")]
        host.register_template("madara", |manifest| {
            let source = crate::sources::MadaraSource::from_manifest(manifest)?;
            Ok(Arc::new(source) as Arc<dyn Source>)
        });

        host
    }

    /// Registers a template under `name`, replacing any previous one.
    pub fn register_template<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ExtensionManifest) -> Result<Arc<dyn Source>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Returns `true` when a template named `name` is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// The registered template names, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TemplateHost {
    fn default() -> Self {
        Self::with_builtin_templates()
    }
}

impl ExtensionHost for TemplateHost {
    fn instantiate(&self, manifest: &ExtensionManifest) -> Result<Arc<dyn Source>> {
        match self.factories.get(&manifest.entry_point) {
            Some(factory) => factory(manifest),
            None => Err(Error::contract_mismatch(
                &manifest.package,
                format!("unknown entry point '{}'", manifest.entry_point),
            )),
        }
    }
}

impl std::fmt::Debug for TemplateHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateHost")
            .field("templates", &self.template_names())
            .finish()
    }
}
