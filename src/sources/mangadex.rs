use crate::{
    error::Result,
    net::HttpClient,
    source::Source,
    types::{
        Capability, Chapter, ContentDetail, ContentItem, ContentPage, FilterKind, PageImage,
        PublicationStatus, SearchFilters, SortOrder, SourceFilter,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Results per listing page requested from the API.
const PAGE_SIZE: u32 = 20;

/// MangaDex API search response
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexSearchResponse {
    data: Vec<MangaDexMangaData>,
    total: u32,
    limit: u32,
    offset: u32,
}

/// MangaDex API manga response
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexMangaResponse {
    data: MangaDexMangaData,
}

/// MangaDex manga data structure
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexMangaData {
    id: String,
    #[serde(rename = "type")]
    data_type: String,
    attributes: MangaDexMangaAttributes,
    relationships: Vec<MangaDexRelationship>,
}

/// MangaDex manga attributes
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexMangaAttributes {
    title: HashMap<String, String>,
    #[serde(rename = "altTitles", default)]
    alt_titles: Vec<HashMap<String, String>>,
    #[serde(default)]
    description: HashMap<String, String>,
    status: String,
    #[serde(default)]
    tags: Vec<MangaDexTag>,
    #[serde(rename = "updatedAt")]
    updated_at: Option<String>,
}

/// MangaDex tag structure
#[derive(Debug, Deserialize)]
struct MangaDexTag {
    attributes: MangaDexTagAttributes,
}

/// MangaDex tag attributes
#[derive(Debug, Deserialize)]
struct MangaDexTagAttributes {
    name: HashMap<String, String>,
    #[serde(default)]
    group: Option<String>,
}

/// MangaDex relationship structure
#[derive(Debug, Deserialize)]
struct MangaDexRelationship {
    #[serde(rename = "type")]
    rel_type: String,
    attributes: Option<MangaDexRelationshipAttributes>,
}

/// MangaDex relationship attributes
#[derive(Debug, Deserialize)]
struct MangaDexRelationshipAttributes {
    name: Option<String>,
    #[serde(rename = "fileName")]
    file_name: Option<String>,
}

/// MangaDex chapter list response
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexChapterListResponse {
    data: Vec<MangaDexChapterData>,
    total: u32,
    limit: u32,
    offset: u32,
}

/// MangaDex chapter data structure
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexChapterData {
    id: String,
    attributes: MangaDexChapterAttributes,
}

/// MangaDex chapter attributes
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct MangaDexChapterAttributes {
    title: Option<String>,
    chapter: Option<String>,
    volume: Option<String>,
    #[serde(rename = "publishAt")]
    publish_at: Option<String>,
    #[serde(rename = "translatedLanguage")]
    translated_language: String,
}

/// MangaDex pages response (at-home server)
#[derive(Debug, Deserialize)]
struct MangaDexPagesResponse {
    #[serde(rename = "baseUrl")]
    base_url: String,
    chapter: MangaDexChapterPages,
}

/// MangaDex chapter pages structure
#[derive(Debug, Deserialize)]
struct MangaDexChapterPages {
    hash: String,
    data: Vec<String>,
    #[serde(rename = "dataSaver")]
    data_saver: Vec<String>,
}

/// MangaDex source implementation for accessing content from MangaDex.org.
///
/// This source talks to the MangaDex API and supports the full contract:
/// search, latest and popularity listings, declarative browse filters,
/// detail lookups, chapter feeds, and page resolution through the at-home
/// server. MangaDex is one of the largest open-source manga platforms with
/// extensive multilingual support.
///
/// # Features
///
/// - Full-text search with status and ordering filters
/// - Multi-language title support (prioritizes English, then Japanese)
/// - Chapter listing with automatic feed pagination
/// - Page URLs with data-saver fallbacks
/// - Built-in rate limiting (1 request per second)
/// - Automatic retry on failed requests
///
/// # Rate Limiting
///
/// This implementation respects MangaDex's API rate limits by enforcing
/// a 1-second delay between requests. The API allows up to 5 requests
/// per second, but we use a conservative limit to avoid issues.
///
/// # Examples
///
/// ```rust
/// use hondana::sources::MangaDexSource;
/// use hondana::prelude::*;
///
/// # async fn example() -> hondana::Result<()> {
/// let source = MangaDexSource::new();
///
/// // Search for content
/// let page = source.search("one piece", 1, &SearchFilters::from("one piece")).await?;
///
/// // Get chapters for the first hit
/// if let Some(item) = page.items.first() {
///     let chapters = source.get_chapter_list(&item.id).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct MangaDexSource {
    client: HttpClient,
    api_base: String,
}

const CAPABILITIES: &[Capability] = &[
    Capability::Search,
    Capability::Latest,
    Capability::Popular,
    Capability::BrowseFilters,
    Capability::ChapterList,
    Capability::PageList,
    Capability::RateLimited,
    Capability::NsfwContent,
];

impl MangaDexSource {
    /// Create a new MangaDex source
    pub fn new() -> Self {
        Self {
            client: HttpClient::new("mgd")
                .with_rate_limit(1000) // 1 second between requests (5 req/sec limit)
                .with_max_retries(3),
            api_base: "https://api.mangadex.org".to_string(),
        }
    }

    /// Extract the best title from a multi-language title map
    fn extract_best_title(title_map: &HashMap<String, String>) -> String {
        // Priority order for title languages
        let priority_langs = ["en", "en-us", "ja", "ja-ro"];

        for lang in &priority_langs {
            if let Some(title) = title_map.get(*lang) {
                if !title.trim().is_empty() {
                    return title.trim().to_string();
                }
            }
        }

        // If no priority language found, take the first available
        title_map
            .values()
            .find(|title| !title.trim().is_empty())
            .map(|title| title.trim().to_string())
            .unwrap_or_else(|| "Unknown Title".to_string())
    }

    /// Query parameters shared by every listing endpoint call
    fn base_listing_params(&self, page: u32) -> Vec<String> {
        let offset = page.saturating_sub(1) * PAGE_SIZE;
        let mut parts = vec![
            format!("limit={}", PAGE_SIZE),
            format!("offset={}", offset),
            "includes[]=cover_art".to_string(),
        ];

        let content_ratings = ["safe", "suggestive", "erotica", "pornographic"];
        for rating in &content_ratings {
            parts.push(format!("contentRating[]={}", rating));
        }

        parts
    }

    /// Format search query parameters
    fn format_search_query(&self, query: &str, page: u32, filters: &SearchFilters) -> String {
        let mut query_parts = self.base_listing_params(page);
        query_parts.push(format!("title={}", urlencoding::encode(query)));

        // Add order parameters
        match filters.sort_by {
            Some(SortOrder::UpdatedAt) => {
                query_parts.push("order[updatedAt]=desc".to_string());
            }
            Some(SortOrder::CreatedAt) => {
                query_parts.push("order[createdAt]=desc".to_string());
            }
            Some(SortOrder::Title) => {
                query_parts.push("order[title]=asc".to_string());
            }
            Some(SortOrder::Popularity) => {
                query_parts.push("order[followedCount]=desc".to_string());
            }
            _ => {
                query_parts.push("order[relevance]=desc".to_string());
            }
        }

        if let Some(status) = status_param(filters.status) {
            query_parts.push(format!("status[]={}", status));
        }

        query_parts.join("&")
    }

    /// Format chapter query parameters
    fn format_chapters_query(&self, offset: u32, limit: u32) -> String {
        let params = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("order[volume]", "asc".to_string()),
            ("order[chapter]", "asc".to_string()),
            ("translatedLanguage[]", "en".to_string()),
            ("contentRating[]", "safe".to_string()),
            ("contentRating[]", "suggestive".to_string()),
            ("contentRating[]", "erotica".to_string()),
            ("contentRating[]", "pornographic".to_string()),
        ];

        params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Fetch one page of a listing endpoint and map it
    async fn fetch_listing(&self, page: u32, order: &str) -> Result<ContentPage<ContentItem>> {
        let mut parts = self.base_listing_params(page);
        parts.push(order.to_string());
        let url = format!("{}/manga?{}", self.api_base, parts.join("&"));

        let response: MangaDexSearchResponse = self.client.get_json(&url).await?;
        Ok(self.map_listing_response(response, page))
    }

    fn map_listing_response(
        &self,
        response: MangaDexSearchResponse,
        page: u32,
    ) -> ContentPage<ContentItem> {
        let items: Vec<ContentItem> = response
            .data
            .iter()
            .map(|manga_data| self.map_manga_data_to_item(manga_data))
            .collect();

        ContentPage {
            items,
            has_next_page: response.offset + response.limit < response.total,
            current_page: page,
        }
    }

    /// Fetch all chapters for a title (handles feed pagination)
    async fn fetch_all_chapters(&self, content_id: &str) -> Result<Vec<Chapter>> {
        let mut all_chapters = Vec::new();
        let mut offset = 0;
        const LIMIT: u32 = 500; // Max limit for this endpoint

        loop {
            let query_params = self.format_chapters_query(offset, LIMIT);
            let url = format!(
                "{}/manga/{}/feed?{}",
                self.api_base, content_id, query_params
            );

            let response: MangaDexChapterListResponse = self.client.get_json(&url).await?;

            for chapter_data in response.data {
                all_chapters.push(self.map_chapter_data_to_chapter(&chapter_data, content_id));
            }

            // Check if we've fetched all chapters
            if response.total <= offset + response.limit {
                break;
            }

            offset += response.limit;
        }

        all_chapters.sort_by(Chapter::ordering);
        Ok(all_chapters)
    }

    /// Map MangaDex chapter data to internal Chapter structure
    fn map_chapter_data_to_chapter(&self, data: &MangaDexChapterData, content_id: &str) -> Chapter {
        let number = data
            .attributes
            .chapter
            .as_ref()
            .and_then(|ch| ch.parse::<f64>().ok())
            .unwrap_or(0.0);

        let title = data
            .attributes
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Chapter {}", number));

        Chapter {
            id: data.id.clone(),
            content_id: content_id.to_string(),
            number,
            volume: data
                .attributes
                .volume
                .as_ref()
                .and_then(|v| v.parse::<f64>().ok()),
            title,
            language: Some(data.attributes.translated_language.clone()),
            published_at: data
                .attributes
                .publish_at
                .as_deref()
                .and_then(parse_datetime),
            source_id: self.id().to_string(),
        }
    }

    /// Extract cover filename from relationship data
    fn extract_cover_filename(&self, data: &MangaDexMangaData) -> Option<String> {
        data.relationships
            .iter()
            .find(|rel| rel.rel_type == "cover_art")
            .and_then(|rel| {
                rel.attributes
                    .as_ref()
                    .and_then(|attr| attr.file_name.as_ref())
                    .cloned()
            })
    }

    /// Map MangaDex manga data to internal ContentItem structure
    fn map_manga_data_to_item(&self, data: &MangaDexMangaData) -> ContentItem {
        let title = Self::extract_best_title(&data.attributes.title);

        // Genre-group tags become genres; everything else only shows up in
        // the detail record's tags.
        let genres: Vec<String> = data
            .attributes
            .tags
            .iter()
            .filter(|tag| tag.attributes.group.as_deref().unwrap_or("genre") == "genre")
            .map(|tag| Self::extract_best_title(&tag.attributes.name))
            .filter(|name| name != "Unknown Title")
            .collect();

        // Try to find cover art URL from relationships using reference expansion
        let cover_url = self.extract_cover_filename(data).map(|filename| {
            format!(
                "https://uploads.mangadex.org/covers/{}/{}",
                data.id, filename
            )
        });

        ContentItem {
            id: data.id.clone(),
            title,
            cover_url,
            url: Some(format!("{}/title/{}", self.base_url(), data.id)),
            status: PublicationStatus::parse(&data.attributes.status),
            rating: None,
            genres,
            source_id: self.id().to_string(),
        }
    }

    /// Map MangaDex manga data to the full ContentDetail structure
    fn map_manga_data_to_detail(&self, data: &MangaDexMangaData) -> ContentDetail {
        let item = self.map_manga_data_to_item(data);

        let description = Self::extract_best_title(&data.attributes.description);
        let description = if description.is_empty() || description == "Unknown Title" {
            None
        } else {
            Some(description)
        };

        let alt_titles: Vec<String> = data
            .attributes
            .alt_titles
            .iter()
            .filter_map(|titles| titles.values().next())
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .collect();

        let tags: Vec<String> = data
            .attributes
            .tags
            .iter()
            .map(|tag| Self::extract_best_title(&tag.attributes.name))
            .filter(|name| name != "Unknown Title")
            .collect();

        ContentDetail {
            item,
            description,
            alt_titles,
            authors: relationship_names(data, "author"),
            artists: relationship_names(data, "artist"),
            tags,
            updated_at: data.attributes.updated_at.as_deref().and_then(parse_datetime),
        }
    }
}

impl Default for MangaDexSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for MangaDexSource {
    fn id(&self) -> &str {
        "mgd"
    }

    fn name(&self) -> &str {
        "MangaDex"
    }

    fn base_url(&self) -> &str {
        "https://mangadex.org"
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn min_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000)
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        filters: &SearchFilters,
    ) -> Result<ContentPage<ContentItem>> {
        let query_params = self.format_search_query(query, page, filters);
        let search_url = format!("{}/manga?{}", self.api_base, query_params);

        let response: MangaDexSearchResponse = self.client.get_json(&search_url).await?;
        Ok(self.map_listing_response(response, page))
    }

    async fn get_content_details(&self, content_id: &str) -> Result<ContentDetail> {
        let url = format!(
            "{}/manga/{}?includes[]=cover_art&includes[]=author&includes[]=artist",
            self.api_base, content_id
        );

        let response: MangaDexMangaResponse = self.client.get_json(&url).await?;
        Ok(self.map_manga_data_to_detail(&response.data))
    }

    async fn get_chapter_list(&self, content_id: &str) -> Result<Vec<Chapter>> {
        self.fetch_all_chapters(content_id).await
    }

    async fn get_page_list(&self, chapter_id: &str) -> Result<Vec<PageImage>> {
        let pages_url = format!("{}/at-home/server/{}", self.api_base, chapter_id);
        let pages_response: MangaDexPagesResponse = self.client.get_json(&pages_url).await?;

        // Validate that we have the necessary data
        if pages_response.chapter.hash.is_empty() {
            return Err(crate::Error::parse("Chapter hash is empty".to_string()));
        }

        if pages_response.base_url.is_empty() {
            return Err(crate::Error::parse("Base URL is empty".to_string()));
        }

        let base = pages_response.base_url.trim_end_matches('/');
        let hash = &pages_response.chapter.hash;

        // Full-quality files are preferred; data-saver fills in as the
        // reduced-quality fallback, or as the primary when it is all we get.
        let pages: Vec<PageImage> = if !pages_response.chapter.data.is_empty() {
            pages_response
                .chapter
                .data
                .iter()
                .enumerate()
                .map(|(i, filename)| PageImage {
                    index: i as u32,
                    url: format!("{}/data/{}/{}", base, hash, filename),
                    data_saver_url: pages_response
                        .chapter
                        .data_saver
                        .get(i)
                        .map(|f| format!("{}/data-saver/{}/{}", base, hash, f)),
                })
                .collect()
        } else {
            pages_response
                .chapter
                .data_saver
                .iter()
                .enumerate()
                .map(|(i, filename)| PageImage {
                    index: i as u32,
                    url: format!("{}/data-saver/{}/{}", base, hash, filename),
                    data_saver_url: None,
                })
                .collect()
        };

        if pages.is_empty() {
            return Err(crate::Error::not_found(format!(
                "No pages found for chapter {}",
                chapter_id
            )));
        }
        Ok(pages)
    }

    async fn get_latest(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        self.fetch_listing(page, "order[latestUploadedChapter]=desc")
            .await
    }

    async fn get_popular(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        self.fetch_listing(page, "order[followedCount]=desc").await
    }

    async fn browse(
        &self,
        filters: &HashMap<String, String>,
        page: u32,
    ) -> Result<ContentPage<ContentItem>> {
        let mut parts = self.base_listing_params(page);

        if let Some(query) = filters.get("query") {
            parts.push(format!("title={}", urlencoding::encode(query)));
        }
        if let Some(status) = filters.get("status") {
            parts.push(format!("status[]={}", status));
        }
        let order = match filters.get("order").map(String::as_str) {
            Some("latest") => "order[latestUploadedChapter]=desc",
            Some("popular") => "order[followedCount]=desc",
            Some("title") => "order[title]=asc",
            _ => "order[relevance]=desc",
        };
        parts.push(order.to_string());

        let url = format!("{}/manga?{}", self.api_base, parts.join("&"));
        let response: MangaDexSearchResponse = self.client.get_json(&url).await?;
        Ok(self.map_listing_response(response, page))
    }

    async fn get_filters(&self) -> Result<Vec<SourceFilter>> {
        Ok(vec![
            SourceFilter {
                id: "query".to_string(),
                label: "Title".to_string(),
                kind: FilterKind::Text,
                options: vec![],
            },
            SourceFilter {
                id: "status".to_string(),
                label: "Publication status".to_string(),
                kind: FilterKind::Select,
                options: vec![
                    "ongoing".to_string(),
                    "completed".to_string(),
                    "hiatus".to_string(),
                    "cancelled".to_string(),
                ],
            },
            SourceFilter {
                id: "order".to_string(),
                label: "Sort order".to_string(),
                kind: FilterKind::Select,
                options: vec![
                    "relevance".to_string(),
                    "latest".to_string(),
                    "popular".to_string(),
                    "title".to_string(),
                ],
            },
        ])
    }
}

fn status_param(status: Option<PublicationStatus>) -> Option<&'static str> {
    match status? {
        PublicationStatus::Ongoing => Some("ongoing"),
        PublicationStatus::Completed => Some("completed"),
        PublicationStatus::Hiatus => Some("hiatus"),
        PublicationStatus::Cancelled => Some("cancelled"),
        PublicationStatus::Unknown => None,
    }
}

fn relationship_names(data: &MangaDexMangaData, rel_type: &str) -> Vec<String> {
    data.relationships
        .iter()
        .filter(|rel| rel.rel_type == rel_type)
        .filter_map(|rel| {
            rel.attributes
                .as_ref()
                .and_then(|attr| attr.name.as_ref())
                .cloned()
        })
        .collect()
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
