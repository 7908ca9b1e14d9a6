//! Scans a plugin directory and installs the extensions it finds.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use semver::Version;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    registry::SourceRegistry,
    source::Source,
    types::ExtensionInfo,
};

use super::host::ExtensionHost;
use super::manifest::{ExtensionManifest, parse_manifest};

/// A candidate the loader refused, and why.
#[derive(Debug, Clone)]
pub struct RejectedExtension {
    /// Path of the offending manifest file.
    pub path: PathBuf,

    /// Human-readable rejection reason.
    pub reason: String,
}

/// Outcome of one [`ExtensionLoader::scan`] pass.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Extensions installed by this pass.
    pub installed: Vec<ExtensionInfo>,

    /// Candidates rejected by this pass.
    pub rejected: Vec<RejectedExtension>,

    /// TOML files that never declared themselves extensions, plus
    /// already-installed packages seen again.
    pub skipped: usize,
}

/// A newer manifest version found for an installed extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAvailable {
    /// Source id of the installed extension.
    pub source_id: String,

    /// Package name of the manifest offering the update.
    pub package: String,

    /// Currently installed version.
    pub installed: Version,

    /// Version found in the plugin directory.
    pub available: Version,
}

/// Discovers, validates, and registers source extensions at runtime.
///
/// The loader owns a plugin directory of TOML manifests. Each
/// [`scan`](ExtensionLoader::scan) pass walks the directory and, for every
/// candidate file:
///
/// 1. Reads and parses the manifest; documents that never declare
///    themselves extensions are skipped silently
/// 2. Skips packages that are already installed
/// 3. Asks the [`ExtensionHost`] to instantiate the declared entry point
/// 4. Validates the instance against the manifest (matching id, non-empty
///    identity accessors, at least one capability)
/// 5. Registers the instance with the shared
///    [`SourceRegistry`](crate::registry::SourceRegistry), enabled only for
///    official extensions
/// 6. Records the installation so it can be listed, updated, and
///    uninstalled later
///
/// A failure at any step rejects that candidate only; the reason is kept
/// (see [`rejections`](ExtensionLoader::rejections)) and the scan moves on
/// to the next file.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use hondana::extension::{ExtensionLoader, TemplateHost};
/// use hondana::registry::SourceRegistry;
///
/// # async fn example() -> hondana::Result<()> {
/// let registry = Arc::new(SourceRegistry::new());
/// let host = Arc::new(TemplateHost::with_builtin_templates());
/// let loader = ExtensionLoader::new("./extensions", host, registry.clone());
///
/// let report = loader.scan().await?;
/// println!(
///     "installed {} extension(s), rejected {}",
///     report.installed.len(),
///     report.rejected.len()
/// );
/// # Ok(())
/// # }
/// ```
pub struct ExtensionLoader {
    plugin_dir: PathBuf,
    host: Arc<dyn ExtensionHost>,
    registry: Arc<SourceRegistry>,
    installed: RwLock<HashMap<String, ExtensionInfo>>,
    rejected: RwLock<Vec<RejectedExtension>>,
}

impl ExtensionLoader {
    /// Creates a loader over `plugin_dir`.
    ///
    /// The directory does not have to exist yet; scanning a missing
    /// directory simply installs nothing.
    pub fn new(
        plugin_dir: impl Into<PathBuf>,
        host: Arc<dyn ExtensionHost>,
        registry: Arc<SourceRegistry>,
    ) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            host,
            registry,
            installed: RwLock::new(HashMap::new()),
            rejected: RwLock::new(Vec::new()),
        }
    }

    /// The directory this loader scans.
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Walks the plugin directory once, installing every valid candidate.
    ///
    /// Candidates are processed in path order so repeated scans of the same
    /// directory behave deterministically. Rejections recorded by earlier
    /// scans are kept; the returned report covers this pass only.
    ///
    /// # Errors
    ///
    /// Only environmental failures (an unreadable directory) abort the
    /// scan. Per-candidate problems are reported, never propagated.
    pub async fn scan(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        let mut dir = match fs::read_dir(&self.plugin_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "Plugin directory {} does not exist, nothing to scan",
                    self.plugin_dir.display()
                );
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };

        let mut candidates = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
                candidates.push(path);
            }
        }
        candidates.sort();

        for path in candidates {
            match self.install_candidate(&path).await {
                Ok(Some(extension)) => {
                    info!(
                        "Installed extension '{}' v{} from {}",
                        extension.source_id,
                        extension.version,
                        path.display()
                    );
                    report.installed.push(extension);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!("Rejected extension candidate {}: {}", path.display(), e);
                    let rejection = RejectedExtension {
                        path,
                        reason: e.to_string(),
                    };
                    self.rejected.write().push(rejection.clone());
                    report.rejected.push(rejection);
                }
            }
        }

        Ok(report)
    }

    async fn install_candidate(&self, path: &Path) -> Result<Option<ExtensionInfo>> {
        let package = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let text = fs::read_to_string(path).await?;
        let Some(manifest) = parse_manifest(&package, &text)? else {
            debug!("Skipping {}: not an extension manifest", path.display());
            return Ok(None);
        };

        // A re-scan of an installed package is a no-op; a different package
        // claiming an installed id is a conflict.
        if let Some(existing) = self.installed.read().get(&manifest.id) {
            if existing.package == manifest.package {
                return Ok(None);
            }
            return Err(Error::contract_mismatch(
                &package,
                format!(
                    "source id '{}' already provided by package '{}'",
                    manifest.id, existing.package
                ),
            ));
        }

        let source = self.host.instantiate(&manifest)?;
        validate_instance(&manifest, source.as_ref())?;

        self.registry.register_with(source, manifest.official)?;

        let extension = manifest.info(manifest.official);
        self.installed
            .write()
            .insert(manifest.id.clone(), extension.clone());
        Ok(Some(extension))
    }

    /// Uninstalls an extension installed by this loader.
    ///
    /// Unregisters the source, forgets the installation record, and deletes
    /// the manifest file so the next scan will not resurrect it. Returns
    /// the record of what was removed.
    ///
    /// # Errors
    ///
    /// [`Error::SourceNotFound`] when `source_id` was not installed through
    /// this loader. Compiled-in sources cannot be uninstalled here.
    pub async fn uninstall(&self, source_id: &str) -> Result<ExtensionInfo> {
        let extension = self
            .installed
            .write()
            .remove(source_id)
            .ok_or_else(|| Error::SourceNotFound(source_id.to_string()))?;

        match self.registry.unregister(source_id) {
            Ok(_) => {}
            Err(Error::SourceNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let manifest_path = self.plugin_dir.join(format!("{}.toml", extension.package));
        match fs::remove_file(&manifest_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!("Uninstalled extension '{}'", source_id);
        Ok(extension)
    }

    /// Re-reads the plugin directory and reports installed extensions whose
    /// manifest now declares a newer version.
    ///
    /// Nothing is installed or replaced; this is a dry run. Unreadable or
    /// invalid manifests are ignored here since
    /// [`scan`](ExtensionLoader::scan) already reports them.
    pub async fn check_updates(&self) -> Result<Vec<UpdateAvailable>> {
        let mut updates = Vec::new();

        let mut dir = match fs::read_dir(&self.plugin_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(updates),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let package = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Ok(text) = fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(Some(manifest)) = parse_manifest(&package, &text) else {
                continue;
            };

            let current = self.installed.read().get(&manifest.id).cloned();
            if let Some(current) = current {
                if manifest.version > current.version {
                    updates.push(UpdateAvailable {
                        source_id: manifest.id,
                        package: manifest.package,
                        installed: current.version,
                        available: manifest.version,
                    });
                }
            }
        }

        updates.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(updates)
    }

    /// Snapshot of all installed extensions, sorted by source id, with
    /// `enabled` reflecting the registry's current flag.
    pub fn extensions(&self) -> Vec<ExtensionInfo> {
        let mut extensions: Vec<ExtensionInfo> =
            self.installed.read().values().cloned().collect();
        for extension in &mut extensions {
            if let Some(enabled) = self.registry.is_enabled(&extension.source_id) {
                extension.enabled = enabled;
            }
        }
        extensions.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        extensions
    }

    /// Every rejection recorded since this loader was created.
    pub fn rejections(&self) -> Vec<RejectedExtension> {
        self.rejected.read().clone()
    }
}

impl std::fmt::Debug for ExtensionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionLoader")
            .field("plugin_dir", &self.plugin_dir)
            .field("installed", &self.installed.read().len())
            .finish()
    }
}

fn validate_instance(manifest: &ExtensionManifest, source: &dyn Source) -> Result<()> {
    if source.id() != manifest.id {
        return Err(Error::contract_mismatch(
            &manifest.package,
            format!(
                "instance reports id '{}' but manifest declares '{}'",
                source.id(),
                manifest.id
            ),
        ));
    }
    if source.name().trim().is_empty() || source.base_url().trim().is_empty() {
        return Err(Error::contract_mismatch(
            &manifest.package,
            "instance reports an empty name or base URL",
        ));
    }
    if source.capabilities().is_empty() {
        return Err(Error::contract_mismatch(
            &manifest.package,
            "instance advertises no capabilities",
        ));
    }
    Ok(())
}
