//! Common test utilities and constants
//!
//! Shared mock sources and fixtures used across all test modules.
// Common test utilities - all must be public

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hondana::error::{Error, Result};
use hondana::prelude::*;

#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Installs a fmt subscriber honoring `RUST_LOG`, once per test binary.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What a [`MockSource`] does when one of its operations is invoked.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the configured items after an optional delay.
    Succeed,
    /// Return a remote failure.
    Fail,
    /// Sleep far longer than any reasonable branch timeout.
    Hang,
}

/// Configurable in-memory source for exercising registry and aggregation
/// paths without any network.
pub struct MockSource {
    id: String,
    name: String,
    language: String,
    capabilities: Vec<Capability>,
    items: Vec<ContentItem>,
    has_next_page: bool,
    behavior: MockBehavior,
    delay: Duration,
    min_interval: Duration,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Mock {}", id),
            language: "en".to_string(),
            capabilities: vec![
                Capability::Search,
                Capability::Latest,
                Capability::Popular,
            ],
            items: Vec::new(),
            has_next_page: false,
            behavior: MockBehavior::Succeed,
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// A source answering every listing with `count` generic items.
    pub fn with_item_count(id: &str, count: usize) -> Self {
        let items = (0..count)
            .map(|i| item(&format!("{}-{}", id, i), &format!("Title {} {}", id, i)))
            .collect();
        Self::new(id).with_items(items)
    }

    pub fn with_items(mut self, items: Vec<ContentItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_next_page(mut self) -> Self {
        self.has_next_page = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.behavior = MockBehavior::Fail;
        self
    }

    pub fn hanging(mut self) -> Self {
        self.behavior = MockBehavior::Hang;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// How many listing calls this source has served.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn listing(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            MockBehavior::Succeed => {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                Ok(ContentPage {
                    items: self.items.clone(),
                    has_next_page: self.has_next_page,
                    current_page: page,
                })
            }
            MockBehavior::Fail => Err(Error::remote(&self.id, "mock failure")),
            MockBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(ContentPage::empty(page))
            }
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        "https://mock.example"
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn min_interval(&self) -> Duration {
        self.min_interval
    }

    async fn search(
        &self,
        _query: &str,
        page: u32,
        _filters: &SearchFilters,
    ) -> Result<ContentPage<ContentItem>> {
        self.listing(page).await
    }

    async fn get_latest(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        if !self.capabilities.contains(&Capability::Latest) {
            return Err(Error::capability(&self.id, Capability::Latest));
        }
        self.listing(page).await
    }

    async fn get_popular(&self, page: u32) -> Result<ContentPage<ContentItem>> {
        if !self.capabilities.contains(&Capability::Popular) {
            return Err(Error::capability(&self.id, Capability::Popular));
        }
        self.listing(page).await
    }

    async fn get_content_details(&self, content_id: &str) -> Result<ContentDetail> {
        match self.items.iter().find(|item| item.id == content_id) {
            Some(item) => Ok(ContentDetail {
                item: item.clone(),
                description: Some("mock description".to_string()),
                alt_titles: vec![],
                authors: vec!["Mock Author".to_string()],
                artists: vec![],
                tags: item.genres.clone(),
                updated_at: None,
            }),
            None => Err(Error::not_found(content_id)),
        }
    }

    async fn get_chapter_list(&self, content_id: &str) -> Result<Vec<Chapter>> {
        Ok(vec![Chapter {
            id: format!("{}-ch1", content_id),
            content_id: content_id.to_string(),
            number: 1.0,
            volume: None,
            title: "Chapter 1".to_string(),
            language: Some(self.language.clone()),
            published_at: None,
            source_id: self.id.clone(),
        }])
    }

    async fn get_page_list(&self, chapter_id: &str) -> Result<Vec<PageImage>> {
        Ok(vec![PageImage {
            index: 0,
            url: format!("https://mock.example/{}/0.png", chapter_id),
            data_saver_url: None,
        }])
    }
}

/// A bare content item for assembling mock listings.
#[allow(dead_code)]
pub fn item(id: &str, title: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        cover_url: None,
        url: None,
        status: hondana::types::PublicationStatus::Unknown,
        rating: None,
        genres: vec![],
        source_id: String::new(),
    }
}

/// Like [`item`], with genres and a publication status attached.
#[allow(dead_code)]
pub fn tagged_item(
    id: &str,
    title: &str,
    genres: &[&str],
    status: hondana::types::PublicationStatus,
) -> ContentItem {
    let mut item = item(id, title);
    item.genres = genres.iter().map(|g| g.to_string()).collect();
    item.status = status;
    item
}

/// Lays out a small on-disk library for the local source:
/// two titles, the first with metadata and two chapters, each chapter
/// holding a couple of page images.
#[allow(dead_code)]
pub async fn build_library(root: &Path) {
    let one_piece = root.join("One Piece");
    tokio::fs::create_dir_all(one_piece.join("Chapter 1"))
        .await
        .unwrap();
    tokio::fs::create_dir_all(one_piece.join("Chapter 2"))
        .await
        .unwrap();

    tokio::fs::write(
        one_piece.join("info.json"),
        r#"{
            "title": "One Piece",
            "description": "Pirates.",
            "status": "ongoing",
            "genres": ["Action", "Adventure"],
            "authors": ["Oda Eiichiro"]
        }"#,
    )
    .await
    .unwrap();
    tokio::fs::write(one_piece.join("cover.jpg"), b"jpg").await.unwrap();

    for chapter in ["Chapter 1", "Chapter 2"] {
        for page in ["001.png", "002.png"] {
            tokio::fs::write(one_piece.join(chapter).join(page), b"png")
                .await
                .unwrap();
        }
    }

    let berserk = root.join("Berserk");
    tokio::fs::create_dir_all(berserk.join("Chapter 364"))
        .await
        .unwrap();
    tokio::fs::write(berserk.join("Chapter 364").join("001.jpg"), b"jpg")
        .await
        .unwrap();
}
