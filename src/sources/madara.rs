use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

use crate::{
    error::{Error, Result},
    extension::ExtensionManifest,
    net::{self, HttpClient},
    source::Source,
    types::{
        Capability, Chapter, ContentDetail, ContentItem, ContentPage, PageImage,
        PublicationStatus, SearchFilters,
    },
};

static NUMBER_IN_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));

/// CSS selectors for one Madara deployment.
///
/// The defaults match an unmodified Madara install; sites that customize the
/// theme override individual selectors through their extension manifest's
/// `[config]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MadaraSelectors {
    /// Container of one listing card.
    pub search_item: String,
    /// Title link inside a listing card.
    pub item_title: String,
    /// Cover image inside a listing card.
    pub item_cover: String,
    /// Title on the detail page.
    pub detail_title: String,
    /// Summary block on the detail page.
    pub detail_description: String,
    /// Author links on the detail page.
    pub detail_author: String,
    /// Genre links on the detail page.
    pub detail_genres: String,
    /// Status text on the detail page.
    pub detail_status: String,
    /// Chapter links on the detail page.
    pub chapter_link: String,
    /// Page images inside a chapter.
    pub page_image: String,
    /// Pagination link indicating a further listing page exists.
    pub next_page: String,
}

impl Default for MadaraSelectors {
    fn default() -> Self {
        Self {
            search_item: ".c-tabs-item__content".to_string(),
            item_title: ".post-title a".to_string(),
            item_cover: "img".to_string(),
            detail_title: ".post-title h1".to_string(),
            detail_description: ".description-summary .summary__content".to_string(),
            detail_author: ".author-content a".to_string(),
            detail_genres: ".genres-content a".to_string(),
            detail_status: ".post-status .summary-content".to_string(),
            chapter_link: "li.wp-manga-chapter a".to_string(),
            page_image: ".page-break img".to_string(),
            next_page: ".wp-pagenavi a.nextpostslink, a.next".to_string(),
        }
    }
}

/// Settings accepted in an extension manifest's `[config]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct MadaraSettings {
    rate_limit_ms: u64,
    headers: HashMap<String, String>,
    #[serde(flatten)]
    selectors: MadaraSelectors,
}

impl Default for MadaraSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 2000,
            headers: HashMap::new(),
            selectors: MadaraSelectors::default(),
        }
    }
}

/// Everything a [`MadaraSource`] needs to target one site.
#[derive(Debug, Clone)]
pub struct MadaraConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub language: String,
    pub version: String,
    pub rate_limit_ms: u64,
    pub headers: HashMap<String, String>,
    pub selectors: MadaraSelectors,
}

impl MadaraConfig {
    /// Config targeting `base_url` with default selectors and a 2 second
    /// request spacing.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            language: "en".to_string(),
            version: "1.0.0".to_string(),
            rate_limit_ms: 2000,
            headers: HashMap::new(),
            selectors: MadaraSelectors::default(),
        }
    }
}

/// Scraping source for sites running the Madara WordPress theme.
///
/// Madara powers hundreds of near-identical manga sites, which makes it the
/// natural target for manifest-driven extensions: one compiled template, any
/// number of installed sites differing only in base URL and selector
/// tweaks. The [`TemplateHost`](crate::extension::TemplateHost) registers
/// this type under the `"madara"` entry point.
///
/// # Examples
///
/// ```rust
/// use hondana::sources::{MadaraConfig, MadaraSource};
///
/// let source = MadaraSource::new(MadaraConfig::new(
///     "madara-demo",
///     "Demo Reader",
///     "https://demo.example",
/// ));
/// ```
pub struct MadaraSource {
    config: MadaraConfig,
    client: HttpClient,
}

const CAPABILITIES: &[Capability] = &[
    Capability::Search,
    Capability::Latest,
    Capability::Popular,
    Capability::ChapterList,
    Capability::PageList,
    Capability::RateLimited,
];

impl MadaraSource {
    /// Creates a source from an explicit config.
    pub fn new(config: MadaraConfig) -> Self {
        let mut client = HttpClient::new(config.id.clone())
            .with_rate_limit(config.rate_limit_ms)
            .with_max_retries(3);
        for (name, value) in &config.headers {
            client = client.with_header(name, value);
        }
        Self { config, client }
    }

    /// Creates a source from a validated extension manifest.
    ///
    /// Identity comes from the manifest itself; selectors, headers, and the
    /// request spacing come from its `[config]` table, falling back to the
    /// stock Madara selectors for anything left unset.
    ///
    /// # Errors
    ///
    /// [`Error::ContractMismatch`] when the `[config]` table has keys of the
    /// wrong type.
    pub fn from_manifest(manifest: &ExtensionManifest) -> Result<Self> {
        let settings: MadaraSettings = toml::Value::Table(manifest.config.clone())
            .try_into()
            .map_err(|e| {
                Error::contract_mismatch(&manifest.package, format!("invalid madara config: {}", e))
            })?;

        Ok(Self::new(MadaraConfig {
            id: manifest.id.clone(),
            name: manifest.name.clone(),
            base_url: manifest.base_url.trim_end_matches('/').to_string(),
            language: manifest.language.clone(),
            version: manifest.version.to_string(),
            rate_limit_ms: settings.rate_limit_ms,
            headers: settings.headers,
            selectors: settings.selectors,
        }))
    }

    /// Resolves a possibly-relative URL against the site root.
    fn full_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.to_string();
        }
        match Url::parse(&self.config.base_url).and_then(|base| base.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
        }
    }

    /// Turns a chapter or title href into the id we hand back to callers:
    /// the URL path below `/manga/`, or the last path segment as a
    /// fallback.
    fn id_from_href(href: &str) -> Option<String> {
        if let Some(tail) = href.split("/manga/").nth(1) {
            let tail = tail.trim_matches('/');
            if !tail.is_empty() {
                return Some(tail.to_string());
            }
        }
        href.split('/')
            .filter(|segment| !segment.is_empty())
            .next_back()
            .map(str::to_string)
    }

    fn parse_listing(&self, html_str: &str, page: u32) -> ContentPage<ContentItem> {
        let html = net::html::parse(html_str);
        let selectors = &self.config.selectors;

        let items = net::html::parse_content_items(&html, &selectors.search_item, |element| {
            let card = net::html::parse(&element.html());
            let title = net::html::select_text(&card, &selectors.item_title)?;
            if title.trim().is_empty() {
                return None;
            }
            let href = net::html::select_attr(&card, &selectors.item_title, "href")?;
            let id = Self::id_from_href(&href)?;

            let cover_url = net::html::select_attr(&card, &selectors.item_cover, "data-src")
                .or_else(|| net::html::select_attr(&card, &selectors.item_cover, "src"))
                .filter(|src| !src.trim().is_empty())
                .map(|src| self.full_url(&src));

            Some(ContentItem {
                id,
                title: title.trim().to_string(),
                cover_url,
                url: Some(self.full_url(&href)),
                status: PublicationStatus::Unknown,
                rating: None,
                genres: vec![],
                source_id: self.config.id.clone(),
            })
        });

        let has_next_page =
            net::html::select_attr(&html, &selectors.next_page, "href").is_some();

        ContentPage {
            items,
            has_next_page,
            current_page: page,
        }
    }

    async fn fetch_listing(&self, page: u32, order: &str) -> Result<ContentPage<ContentItem>> {
        let url = format!(
            "{}/manga/page/{}/?m_orderby={}",
            self.config.base_url.trim_end_matches('/'),
            page,
            order
        );
        let html_str = self.client.get_text(&url).await?;
        Ok(self.parse_listing(&html_str, page))
    }

    async fn fetch_detail_page(&self, content_id: &str) -> Result<String> {
        let url = self.full_url(&format!("manga/{}/", content_id.trim_matches('/')));
        self.client.get_text(&url).await
    }
}

#[async_trait]
impl Source for MadaraSource {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn language(&self) -> &str {
        &self.config.language
    }

    fn version(&self) -> &str {
        &self.config.version
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn min_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.config.rate_limit_ms)
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        _filters: &SearchFilters,
    ) -> Result<ContentPage<ContentItem>> {
        let url = format!(
            "{}/page/{}/?s={}&post_type=wp-manga",
            self.config.base_url.trim_end_matches('/'),
            page,
            urlencoding::encode(query)
        );

        let html_str = self.client.get_text(&url).await?;
        Ok(self.parse_listing(&html_str, page))
    }

    async fn get_latest(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        self.fetch_listing(page, "latest").await
    }

    async fn get_popular(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        self.fetch_listing(page, "views").await
    }

    async fn get_content_details(&self, content_id: &str) -> Result<ContentDetail> {
        let html_str = self.fetch_detail_page(content_id).await?;
        let html = net::html::parse(&html_str);
        let selectors = &self.config.selectors;

        let title = net::html::select_text(&html, &selectors.detail_title)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::not_found(content_id))?;

        let cover_url = net::html::select_attr(&html, ".summary_image img", "data-src")
            .or_else(|| net::html::select_attr(&html, ".summary_image img", "src"))
            .map(|src| self.full_url(&src));

        let status = net::html::select_text(&html, &selectors.detail_status)
            .as_deref()
            .map(PublicationStatus::parse)
            .unwrap_or_default();

        let genres = net::html::select_all_text(&html, &selectors.detail_genres);

        let item = ContentItem {
            id: content_id.to_string(),
            title,
            cover_url,
            url: Some(self.full_url(&format!("manga/{}/", content_id))),
            status,
            rating: None,
            genres: genres.clone(),
            source_id: self.config.id.clone(),
        };

        Ok(ContentDetail {
            item,
            description: net::html::select_text(&html, &selectors.detail_description)
                .filter(|d| !d.is_empty()),
            alt_titles: vec![],
            authors: net::html::select_all_text(&html, &selectors.detail_author),
            artists: vec![],
            tags: genres,
            updated_at: None,
        })
    }

    async fn get_chapter_list(&self, content_id: &str) -> Result<Vec<Chapter>> {
        let html_str = self.fetch_detail_page(content_id).await?;
        let html = net::html::parse(&html_str);
        let selectors = &self.config.selectors;

        let links = net::html::select_all_attr(&html, &selectors.chapter_link, "href");
        let titles = net::html::select_all_text(&html, &selectors.chapter_link);

        // Madara lists newest first; number from the title when present,
        // else from the position counted from the bottom.
        let total = links.len();
        let mut chapters: Vec<Chapter> = links
            .into_iter()
            .zip(titles)
            .enumerate()
            .filter_map(|(i, (href, title))| {
                let id = Self::id_from_href(&href)?;
                let number = NUMBER_IN_TITLE
                    .captures(&title)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or((total - i) as f64);

                Some(Chapter {
                    id,
                    content_id: content_id.to_string(),
                    number,
                    volume: None,
                    title: title.trim().to_string(),
                    language: Some(self.config.language.clone()),
                    published_at: None,
                    source_id: self.config.id.clone(),
                })
            })
            .collect();

        chapters.sort_by(Chapter::ordering);
        Ok(chapters)
    }

    async fn get_page_list(&self, chapter_id: &str) -> Result<Vec<PageImage>> {
        let html_str = self.fetch_detail_page(chapter_id).await?;
        let html = net::html::parse(&html_str);

        let images = net::html::select_all_attr(&html, &self.config.selectors.page_image, "src");

        // Lazy-loading themes leave placeholders in src; anything that
        // doesn't look like a real page image is dropped.
        let pages: Vec<PageImage> = images
            .into_iter()
            .map(|src| src.trim().to_string())
            .filter(|src| {
                !src.is_empty()
                    && !src.contains("loading")
                    && !src.contains("banner")
                    && ["jpg", "jpeg", "png", "webp"]
                        .iter()
                        .any(|ext| src.contains(ext))
            })
            .enumerate()
            .map(|(index, src)| PageImage {
                index: index as u32,
                url: self.full_url(&src),
                data_saver_url: None,
            })
            .collect();

        if pages.is_empty() {
            return Err(Error::not_found(format!(
                "No pages found for chapter {}",
                chapter_id
            )));
        }
        Ok(pages)
    }
}
