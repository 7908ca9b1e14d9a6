//! Extension manifest format and parsing.
//!
//! A manifest is a TOML file that declares one source extension. Parsing is
//! deliberately two-phased so that a plugin directory can hold unrelated
//! TOML files without noise:
//!
//! 1. If the document lacks the `source = true` marker, an `entry_point`,
//!    or a `version`, it simply isn't an extension manifest and parsing
//!    yields `Ok(None)`.
//! 2. Once a document declares itself an extension, every remaining problem
//!    (missing identity fields, bad types, an unparseable version) is an
//!    error the loader records against that candidate.

use semver::Version;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::ExtensionInfo;

/// A fully validated extension manifest.
///
/// Produced by [`parse_manifest`]; everything required is guaranteed
/// present and well-formed. The free-form `config` table is handed to the
/// host template verbatim, so templates can define their own settings
/// without the loader knowing about them.
#[derive(Debug, Clone)]
pub struct ExtensionManifest {
    /// Package name, taken from the manifest file stem.
    pub package: String,

    /// Source id the instance must register under.
    pub id: String,

    /// Human-readable source name.
    pub name: String,

    /// Template name resolved by the [`ExtensionHost`](super::ExtensionHost).
    pub entry_point: String,

    /// Declared semantic version.
    pub version: Version,

    /// Root URL of the provider.
    pub base_url: String,

    /// Primary content language.
    pub language: String,

    /// Official extensions register enabled; unofficial ones start disabled.
    pub official: bool,

    /// Optional icon for management UIs.
    pub icon_url: Option<String>,

    /// Optional short description.
    pub description: Option<String>,

    /// Template-specific settings, passed through untouched.
    pub config: toml::Table,
}

impl ExtensionManifest {
    /// Builds the [`ExtensionInfo`] record the loader keeps for this
    /// manifest once it has been installed.
    pub fn info(&self, enabled: bool) -> ExtensionInfo {
        ExtensionInfo {
            package: self.package.clone(),
            entry_point: self.entry_point.clone(),
            version: self.version.clone(),
            source_id: self.id.clone(),
            enabled,
            official: self.official,
            icon_url: self.icon_url.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    id: Option<String>,
    name: Option<String>,
    entry_point: Option<String>,
    version: Option<String>,
    base_url: Option<String>,
    language: Option<String>,
    #[serde(default)]
    official: bool,
    icon_url: Option<String>,
    description: Option<String>,
    #[serde(default)]
    config: toml::Table,
}

/// Parses one candidate manifest.
///
/// # Returns
///
/// * `Ok(Some(manifest))` - A valid extension manifest
/// * `Ok(None)` - A well-formed TOML document that never declared itself an
///   extension (no `source = true` marker, or no `entry_point`/`version`)
/// * `Err(_)` - Malformed TOML, or a declared extension that is missing
///   required fields or carries an invalid version
///
/// # Examples
///
/// ```rust
/// use hondana::extension::parse_manifest;
///
/// let text = r#"
///     source = true
///     id = "demo"
///     name = "Demo"
///     entry_point = "madara"
///     version = "1.0.0"
///     base_url = "https://demo.example"
/// "#;
///
/// let manifest = parse_manifest("demo", text).unwrap().unwrap();
/// assert_eq!(manifest.id, "demo");
/// assert_eq!(manifest.version.major, 1);
///
/// // Unrelated TOML is skipped, not rejected
/// assert!(parse_manifest("other", "key = 'value'").unwrap().is_none());
///
/// // A declared extension with a broken version is an error
/// let broken = r#"
///     source = true
///     entry_point = "madara"
///     version = "not-a-version"
/// "#;
/// assert!(parse_manifest("broken", broken).is_err());
/// ```
pub fn parse_manifest(package: &str, text: &str) -> Result<Option<ExtensionManifest>> {
    let table: toml::Table = text.parse()?;

    // Phase 1: is this document even claiming to be an extension?
    let declares = table
        .get("source")
        .and_then(toml::Value::as_bool)
        .unwrap_or(false);
    let has_entry = table
        .get("entry_point")
        .and_then(toml::Value::as_str)
        .is_some();
    let has_version = table.get("version").and_then(toml::Value::as_str).is_some();

    if !declares || !has_entry || !has_version {
        return Ok(None);
    }

    // Phase 2: it is, so hold it to the full contract.
    let raw: RawManifest = toml::Value::Table(table).try_into()?;

    let id = required(package, raw.id, "id")?;
    let name = required(package, raw.name, "name")?;
    let base_url = required(package, raw.base_url, "base_url")?;
    let entry_point = required(package, raw.entry_point, "entry_point")?;
    let version = Version::parse(&required(package, raw.version, "version")?)?;

    Ok(Some(ExtensionManifest {
        package: package.to_string(),
        id,
        name,
        entry_point,
        version,
        base_url,
        language: raw.language.unwrap_or_else(|| "en".to_string()),
        official: raw.official,
        icon_url: raw.icon_url,
        description: raw.description,
        config: raw.config,
    }))
}

fn required(package: &str, value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::contract_mismatch(
            package,
            format!("manifest field '{}' is missing or empty", field),
        )),
    }
}
