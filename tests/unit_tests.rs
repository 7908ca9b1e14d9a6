use hondana::prelude::*;
use hondana::types::{PublicationStatus, SearchFiltersBuilder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_filters_builder() {
        let filters = SearchFiltersBuilder::default()
            .query("test manga")
            .include_genres(vec!["Action".to_string(), "Adventure".to_string()])
            .status(Some(PublicationStatus::Ongoing))
            .sort_by(Some(SortOrder::UpdatedAt))
            .build()
            .unwrap();

        assert_eq!(filters.query, "test manga");
        assert_eq!(filters.include_genres.len(), 2);
        assert!(filters.include_genres.contains(&"Action".to_string()));
        assert!(filters.exclude_genres.is_empty());
        assert!(filters.source_ids.is_empty());
        assert_eq!(filters.status, Some(PublicationStatus::Ongoing));
        assert!(matches!(filters.sort_by, Some(SortOrder::UpdatedAt)));
    }

    #[test]
    fn test_filters_from_query_string() {
        let filters = SearchFilters::from("one piece");
        assert_eq!(filters.query, "one piece");
        assert!(filters.include_genres.is_empty());
        assert!(filters.status.is_none());
    }

    #[test]
    fn test_content_item_struct() {
        let item = ContentItem {
            id: "test-id".to_string(),
            title: "Test Title".to_string(),
            cover_url: Some("https://example.com/cover.jpg".to_string()),
            url: None,
            status: PublicationStatus::Completed,
            rating: Some(8.5),
            genres: vec!["Action".to_string(), "Adventure".to_string()],
            source_id: "test".to_string(),
        };

        assert_eq!(item.id, "test-id");
        assert_eq!(item.status, PublicationStatus::Completed);
        assert_eq!(item.genres.len(), 2);
        assert_eq!(item.source_id, "test");
        assert!(item.cover_url.is_some());
    }

    #[test]
    fn test_publication_status_parse() {
        assert_eq!(
            PublicationStatus::parse("Ongoing"),
            PublicationStatus::Ongoing
        );
        assert_eq!(
            PublicationStatus::parse("releasing"),
            PublicationStatus::Ongoing
        );
        assert_eq!(
            PublicationStatus::parse("COMPLETED"),
            PublicationStatus::Completed
        );
        assert_eq!(
            PublicationStatus::parse("on hiatus"),
            PublicationStatus::Hiatus
        );
        assert_eq!(
            PublicationStatus::parse("canceled"),
            PublicationStatus::Cancelled
        );
        assert_eq!(
            PublicationStatus::parse("something else"),
            PublicationStatus::Unknown
        );
    }

    #[test]
    fn test_chapter_ordering() {
        let chapter = |number: f64, volume: Option<f64>, id: &str| Chapter {
            id: id.to_string(),
            content_id: "c".to_string(),
            number,
            volume,
            title: String::new(),
            language: None,
            published_at: None,
            source_id: "test".to_string(),
        };

        let mut chapters = vec![
            chapter(2.0, None, "a"),
            chapter(1.0, Some(2.0), "b"),
            chapter(1.0, Some(1.0), "c"),
            chapter(1.5, None, "d"),
        ];
        chapters.sort_by(Chapter::ordering);

        let ids: Vec<&str> = chapters.iter().map(|ch| ch.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "d", "a"]);
    }

    #[test]
    fn test_chapter_ordering_is_stable_on_full_ties() {
        let chapter = |id: &str| Chapter {
            id: id.to_string(),
            content_id: "c".to_string(),
            number: 3.0,
            volume: None,
            title: String::new(),
            language: None,
            published_at: None,
            source_id: "test".to_string(),
        };

        let mut chapters = vec![chapter("first"), chapter("second"), chapter("third")];
        chapters.sort_by(Chapter::ordering);

        // sort_by is stable, so insertion order decides ties
        assert_eq!(chapters[0].id, "first");
        assert_eq!(chapters[2].id, "third");
    }

    #[test]
    fn test_content_page_empty() {
        let page: ContentPage<ContentItem> = ContentPage::empty(3);
        assert!(page.items.is_empty());
        assert!(!page.has_next_page);
        assert_eq!(page.current_page, 3);
    }

    #[test]
    fn test_grouped_results_helpers() {
        let mut grouped = GroupedSearchResults::empty();
        assert!(grouped.is_empty());
        assert_eq!(grouped.total_count, 0);

        let hit = |id: &str, source: &str| SearchResult {
            item: ContentItem {
                id: id.to_string(),
                title: id.to_string(),
                cover_url: None,
                url: None,
                status: PublicationStatus::Unknown,
                rating: None,
                genres: vec![],
                source_id: source.to_string(),
            },
            source_id: source.to_string(),
            source_name: source.to_uppercase(),
        };

        grouped
            .results
            .insert("beta".to_string(), vec![hit("b1", "beta")]);
        grouped
            .results
            .insert("alpha".to_string(), vec![hit("a1", "alpha"), hit("a2", "alpha")]);
        grouped.total_count = 3;

        assert_eq!(grouped.source_ids(), vec!["alpha", "beta"]);

        let flat = grouped.flatten();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].source_id, "alpha");
        assert_eq!(flat[2].source_id, "beta");
    }

    #[test]
    fn test_capability_display_tags() {
        assert_eq!(Capability::Search.to_string(), "SEARCH");
        assert_eq!(Capability::BrowseFilters.to_string(), "BROWSE_FILTERS");
        assert_eq!(Capability::NsfwContent.to_string(), "NSFW_CONTENT");
    }

    #[test]
    fn test_error_display() {
        let err = hondana::Error::remote("mgd", "HTTP 503");
        assert!(err.to_string().contains("mgd"));
        assert!(err.to_string().contains("HTTP 503"));

        let err = hondana::Error::DuplicateSourceId("local".to_string());
        assert!(err.to_string().contains("local"));

        let err = hondana::Error::capability("local", Capability::BrowseFilters);
        assert!(err.to_string().contains("BROWSE_FILTERS"));
    }

    #[test]
    fn test_branch_error_classification() {
        use std::time::Duration;

        assert!(hondana::Error::remote("a", "down").is_branch_error());
        assert!(hondana::Error::timeout("a", Duration::from_secs(5)).is_branch_error());
        assert!(hondana::Error::capability("a", Capability::Latest).is_branch_error());

        assert!(!hondana::Error::SourceNotFound("a".to_string()).is_branch_error());
        assert!(!hondana::Error::DuplicateSourceId("a".to_string()).is_branch_error());
        assert!(!hondana::Error::Cancelled.is_branch_error());
    }

    #[test]
    fn test_search_results_ext() {
        let hit = |title: &str, genres: &[&str]| SearchResult {
            item: ContentItem {
                id: title.to_string(),
                title: title.to_string(),
                cover_url: None,
                url: None,
                status: PublicationStatus::Unknown,
                rating: None,
                genres: genres.iter().map(|g| g.to_string()).collect(),
                source_id: "a".to_string(),
            },
            source_id: "a".to_string(),
            source_name: "A".to_string(),
        };

        let results = vec![
            hit("Naruto", &["Action"]),
            hit("naruto", &["Action"]),
            hit("Bleach", &["Supernatural"]),
        ];

        let deduped = results.dedupe_by_title();
        assert_eq!(deduped.len(), 2);

        let sorted = deduped.sort_by_title();
        assert_eq!(sorted[0].item.title, "Bleach");

        let filtered = sorted.filter_by_genre("action");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].item.title, "Naruto");
    }
}
