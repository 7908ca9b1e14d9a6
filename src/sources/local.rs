use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::warn;

use crate::{
    error::{Error, Result},
    source::Source,
    types::{
        Capability, Chapter, ContentDetail, ContentItem, ContentPage, PageImage,
        PublicationStatus, SearchFilters,
    },
};

const PAGE_SIZE: usize = 20;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

static CHAPTER_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:chapter|ch\.?)\s*(\d+(?:\.\d+)?)").expect("valid regex"));

static VOLUME_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)vol(?:ume)?\.?\s*(\d+(?:\.\d+)?)").expect("valid regex"));

static ANY_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));

/// Optional per-title metadata file (`info.json`).
#[derive(Debug, Default, Deserialize)]
struct LocalInfo {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    rating: Option<f32>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    artists: Vec<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    alt_titles: Vec<String>,
}

/// Source backed by a directory tree on the local filesystem.
///
/// Useful both as a real source for already-downloaded libraries and as the
/// reference implementation of the contract with no network in the way.
///
/// # Library Layout
///
/// ```text
/// library/
/// ├── One Piece/
/// │   ├── info.json          (optional metadata)
/// │   ├── cover.jpg          (optional cover)
/// │   ├── Chapter 1/
/// │   │   ├── 001.png
/// │   │   └── 002.png
/// │   └── Chapter 2/
/// │       └── 001.png
/// └── Berserk/
///     └── Chapter 364/
///         └── 001.jpg
/// ```
///
/// Every directory under the root is one title; every subdirectory of a
/// title is one chapter; image files inside a chapter are its pages.
/// Chapter numbers are recognized from directory names ("Chapter 12",
/// "Ch. 12.5", a bare "12"), so existing download folders usually work
/// without renaming.
///
/// # Examples
///
/// ```rust
/// use hondana::sources::LocalSource;
///
/// let source = LocalSource::new("/data/library");
/// ```
pub struct LocalSource {
    root: PathBuf,
    root_display: String,
}

const CAPABILITIES: &[Capability] = &[
    Capability::Search,
    Capability::Latest,
    Capability::ChapterList,
    Capability::PageList,
];

impl LocalSource {
    /// Creates a source over the library rooted at `root`.
    ///
    /// The directory does not have to exist yet; an absent root behaves
    /// like an empty library.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root_display = root.display().to_string();
        Self { root, root_display }
    }

    /// All title directories under the root, sorted by name.
    async fn content_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut dirs = Vec::new();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(dirs),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            dirs.push((name, entry.path()));
        }

        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }

    async fn read_info(&self, dir: &Path) -> LocalInfo {
        match fs::read(dir.join("info.json")).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", dir.join("info.json").display(), e);
                LocalInfo::default()
            }),
            Err(_) => LocalInfo::default(),
        }
    }

    fn item_from_info(&self, name: &str, path: &Path, info: &LocalInfo, cover: Option<String>) -> ContentItem {
        ContentItem {
            id: name.to_string(),
            title: info.title.clone().unwrap_or_else(|| name.to_string()),
            cover_url: cover,
            url: Some(path.display().to_string()),
            status: info
                .status
                .as_deref()
                .map(PublicationStatus::parse)
                .unwrap_or_default(),
            rating: info.rating,
            genres: info.genres.clone(),
            source_id: self.id().to_string(),
        }
    }

    async fn build_item(&self, name: &str, path: &Path) -> ContentItem {
        let info = self.read_info(path).await;
        let cover = find_cover(path).await;
        self.item_from_info(name, path, &info, cover)
    }

    async fn require_dir(&self, path: &Path, what: &str) -> Result<()> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(Error::not_found(what)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::not_found(what)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Source for LocalSource {
    fn id(&self) -> &str {
        "local"
    }

    fn name(&self) -> &str {
        "Local Library"
    }

    fn base_url(&self) -> &str {
        &self.root_display
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn min_interval(&self) -> std::time::Duration {
        // Disk reads need no pacing.
        std::time::Duration::ZERO
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        _filters: &SearchFilters,
    ) -> Result<ContentPage<ContentItem>> {
        let needle = query.trim().to_lowercase();
        let mut items = Vec::new();

        for (name, path) in self.content_dirs().await? {
            let item = self.build_item(&name, &path).await;
            if needle.is_empty()
                || name.to_lowercase().contains(&needle)
                || item.title.to_lowercase().contains(&needle)
            {
                items.push(item);
            }
        }

        Ok(paginate(items, page))
    }

    async fn get_latest(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        let mut dirs = Vec::new();
        for (name, path) in self.content_dirs().await? {
            let modified = fs::metadata(&path)
                .await
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            dirs.push((modified, name, path));
        }
        dirs.sort_by(|a, b| b.0.cmp(&a.0));

        let mut items = Vec::new();
        for (_, name, path) in dirs {
            items.push(self.build_item(&name, &path).await);
        }

        Ok(paginate(items, page))
    }

    async fn get_content_details(&self, content_id: &str) -> Result<ContentDetail> {
        let dir = self.root.join(content_id);
        self.require_dir(&dir, content_id).await?;

        let info = self.read_info(&dir).await;
        let cover = find_cover(&dir).await;
        let item = self.item_from_info(content_id, &dir, &info, cover);

        let updated_at = fs::metadata(&dir)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(ContentDetail {
            item,
            description: info.description,
            alt_titles: info.alt_titles,
            authors: info.authors,
            artists: info.artists,
            tags: info.tags,
            updated_at,
        })
    }

    async fn get_chapter_list(&self, content_id: &str) -> Result<Vec<Chapter>> {
        let dir = self.root.join(content_id);
        self.require_dir(&dir, content_id).await?;

        let mut chapters = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let published_at = entry
                .metadata()
                .await
                .ok()
                .and_then(|meta| meta.modified().ok())
                .map(DateTime::<Utc>::from);

            chapters.push(Chapter {
                id: format!("{}/{}", content_id, name),
                content_id: content_id.to_string(),
                number: extract_chapter_number(&name),
                volume: extract_volume_number(&name),
                title: name,
                language: None,
                published_at,
                source_id: self.id().to_string(),
            });
        }

        chapters.sort_by(Chapter::ordering);
        Ok(chapters)
    }

    async fn get_page_list(&self, chapter_id: &str) -> Result<Vec<PageImage>> {
        let dir = self.root.join(chapter_id);
        self.require_dir(&dir, chapter_id).await?;

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_image(&path) {
                let name = entry.file_name().to_string_lossy().into_owned();
                files.push((name, path));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(files
            .into_iter()
            .enumerate()
            .map(|(index, (_, path))| PageImage {
                index: index as u32,
                url: path.display().to_string(),
                data_saver_url: None,
            })
            .collect())
    }
}

fn paginate(items: Vec<ContentItem>, page: u32) -> ContentPage<ContentItem> {
    let start = page.saturating_sub(1) as usize * PAGE_SIZE;
    let has_next_page = items.len() > start + PAGE_SIZE;
    let items = items.into_iter().skip(start).take(PAGE_SIZE).collect();

    ContentPage {
        items,
        has_next_page,
        current_page: page,
    }
}

/// Pulls a chapter number out of a directory name.
///
/// "Chapter 12", "ch 12.5", and plain "0043" all resolve; names without
/// any number sort first as chapter 0.
fn extract_chapter_number(name: &str) -> f64 {
    let captured = CHAPTER_NUMBER
        .captures(name)
        .or_else(|| ANY_NUMBER.captures(name));

    captured
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn extract_volume_number(name: &str) -> Option<f64> {
    VOLUME_NUMBER
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

async fn find_cover(dir: &Path) -> Option<String> {
    for name in ["cover.jpg", "cover.jpeg", "cover.png", "cover.webp"] {
        let path = dir.join(name);
        if fs::metadata(&path).await.is_ok() {
            return Some(path.display().to_string());
        }
    }
    None
}
