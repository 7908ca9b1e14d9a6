//! Aggregate search behavior: fan-out, partial failure, post-filtering,
//! pagination heuristics, and cancellation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use hondana::aggregator::{QueryState, SearchAggregator};
use hondana::registry::SourceRegistry;
use hondana::types::{PublicationStatus, SearchFilters, SearchFiltersBuilder};
use hondana::Error;

mod common;
use common::{item, tagged_item, MockSource};

fn registry_with(sources: Vec<MockSource>) -> Arc<SourceRegistry> {
    let registry = Arc::new(SourceRegistry::new());
    for source in sources {
        registry.register(Arc::new(source)).unwrap();
    }
    registry
}

#[cfg(test)]
mod aggregator_tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_sources_drop_out_of_grouped_results() {
        // 5 sources, 2 failing: exactly 3 keys survive
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 1),
            MockSource::with_item_count("b", 2),
            MockSource::with_item_count("c", 3).failing(),
            MockSource::with_item_count("d", 1),
            MockSource::with_item_count("e", 1).failing(),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();

        assert_eq!(results.source_ids(), vec!["a", "b", "d"]);
        assert_eq!(results.total_count, 4);
    }

    #[tokio::test]
    async fn test_failure_and_timeout_are_isolated() {
        // A returns 2 items, B fails remotely, C exceeds the branch timeout
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 2),
            MockSource::with_item_count("b", 5).failing(),
            MockSource::with_item_count("c", 5).hanging(),
        ]);
        let aggregator =
            SearchAggregator::new(registry).with_timeout(Duration::from_millis(200));

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();

        assert_eq!(results.source_ids(), vec!["a"]);
        assert_eq!(results.results["a"].len(), 2);
        assert_eq!(results.total_count, 2);
        assert!(!results.has_more);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_still_success() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 1).failing(),
            MockSource::with_item_count("b", 1).failing(),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(results.total_count, 0);
        assert!(!results.has_more);
    }

    #[tokio::test]
    async fn test_no_eligible_sources_resolves_empty() {
        let registry = Arc::new(SourceRegistry::new());
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_sources_are_skipped() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 1),
            MockSource::with_item_count("b", 1),
        ]);
        registry.set_enabled("b", false).unwrap();
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert_eq!(results.source_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_source_ids_allow_list_intersects_enabled_set() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 1),
            MockSource::with_item_count("b", 1),
            MockSource::with_item_count("c", 1),
        ]);
        registry.set_enabled("c", false).unwrap();
        let aggregator = SearchAggregator::new(registry);

        let filters = SearchFiltersBuilder::default()
            .query("query")
            .source_ids(vec!["b".to_string(), "c".to_string()])
            .build()
            .unwrap();

        // c is named but disabled; only b participates
        let results = aggregator.search(&filters, 1).await.unwrap();
        assert_eq!(results.source_ids(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_language_filter_restricts_sources() {
        let registry = registry_with(vec![
            MockSource::with_item_count("en-src", 1).with_language("en"),
            MockSource::with_item_count("ja-src", 1).with_language("ja"),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let filters = SearchFiltersBuilder::default()
            .query("query")
            .language(Some("ja".to_string()))
            .build()
            .unwrap();

        let results = aggregator.search(&filters, 1).await.unwrap();
        assert_eq!(results.source_ids(), vec!["ja-src"]);
    }

    #[tokio::test]
    async fn test_genre_and_status_post_filters() {
        let source = MockSource::new("a").with_items(vec![
            tagged_item("1", "Keep", &["Action", "Drama"], PublicationStatus::Ongoing),
            tagged_item("2", "Wrong status", &["Action"], PublicationStatus::Completed),
            tagged_item("3", "Missing genre", &["Drama"], PublicationStatus::Ongoing),
            tagged_item("4", "Banned genre", &["Action", "Ecchi"], PublicationStatus::Ongoing),
        ]);
        let aggregator = SearchAggregator::new(registry_with(vec![source]));

        let filters = SearchFiltersBuilder::default()
            .query("query")
            .include_genres(vec!["action".to_string()])
            .exclude_genres(vec!["ecchi".to_string()])
            .status(Some(PublicationStatus::Ongoing))
            .build()
            .unwrap();

        let results = aggregator.search(&filters, 1).await.unwrap();
        assert_eq!(results.total_count, 1);
        assert_eq!(results.results["a"][0].item.title, "Keep");
    }

    #[tokio::test]
    async fn test_sources_with_empty_contribution_are_absent() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 2),
            MockSource::new("b"), // succeeds with zero items
        ]);
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert_eq!(results.source_ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_results_are_stamped_with_source_identity() {
        let source = MockSource::new("a").with_items(vec![item("x", "X")]);
        let aggregator = SearchAggregator::new(registry_with(vec![source]));

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        let hit = &results.results["a"][0];
        assert_eq!(hit.source_id, "a");
        assert_eq!(hit.source_name, "Mock a");
        assert_eq!(hit.item.source_id, "a");
    }

    #[tokio::test]
    async fn test_has_more_from_source_continuation() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 3).with_next_page(),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert!(results.has_more);
    }

    #[tokio::test]
    async fn test_has_more_from_total_threshold() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 12),
            MockSource::with_item_count("b", 12),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert_eq!(results.total_count, 24);
        assert!(results.has_more);
    }

    #[tokio::test]
    async fn test_latest_and_popular_skip_incapable_sources() {
        use hondana::types::Capability;

        let registry = registry_with(vec![
            MockSource::with_item_count("full", 1),
            MockSource::with_item_count("search-only", 1)
                .with_capabilities(vec![Capability::Search]),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let latest = aggregator.get_latest(1).await.unwrap();
        assert_eq!(latest.source_ids(), vec!["full"]);

        let popular = aggregator.get_popular(1).await.unwrap();
        assert_eq!(popular.source_ids(), vec!["full"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_new_query_supersedes_in_flight_one() {
        let registry = registry_with(vec![
            MockSource::with_item_count("slow", 1).with_delay(Duration::from_millis(400)),
        ]);
        let aggregator = Arc::new(SearchAggregator::new(registry));

        let first = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move {
                aggregator.search(&SearchFilters::from("first"), 1).await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = aggregator
            .search(&SearchFilters::from("second"), 1)
            .await;

        // Only the newer query's result is delivered
        assert!(matches!(first.await.unwrap(), Err(Error::Cancelled)));
        assert_eq!(second.unwrap().total_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_search_aborts_in_flight_query() {
        let registry = registry_with(vec![
            MockSource::with_item_count("slow", 1).with_delay(Duration::from_millis(400)),
        ]);
        let aggregator = Arc::new(SearchAggregator::new(registry));

        let in_flight = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move {
                aggregator.search(&SearchFilters::from("query"), 1).await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        aggregator.cancel_search();

        assert!(matches!(in_flight.await.unwrap(), Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_search_in_source_targets_one_provider() {
        let registry = registry_with(vec![
            MockSource::with_item_count("a", 2),
            MockSource::with_item_count("b", 5),
        ]);
        let aggregator = SearchAggregator::new(registry);

        let page = aggregator.search_in_source("a", "query", 1).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|item| item.source_id == "a"));
    }

    #[tokio::test]
    async fn test_search_in_source_unknown_id() {
        let aggregator = SearchAggregator::new(Arc::new(SourceRegistry::new()));
        let err = aggregator
            .search_in_source("ghost", "query", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_search_in_source_propagates_source_errors() {
        let registry = registry_with(vec![MockSource::with_item_count("a", 1).failing()]);
        let aggregator = SearchAggregator::new(registry);

        let err = aggregator
            .search_in_source("a", "query", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemoteFailure { .. }));
    }

    #[tokio::test]
    async fn test_stream_emits_loading_then_terminal() {
        let registry = registry_with(vec![MockSource::with_item_count("a", 2)]);
        let aggregator = SearchAggregator::new(registry);

        let stream = aggregator.search_stream(SearchFilters::from("query"), 1);
        let states: Vec<QueryState> = stream.collect().await;

        assert_eq!(states.len(), 2);
        assert!(states[0].is_loading());
        match &states[1] {
            QueryState::Ready(results) => assert_eq!(results.total_count, 2),
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bounded_concurrency_still_reaches_every_source() {
        let sources: Vec<MockSource> = (0..10)
            .map(|i| MockSource::with_item_count(&format!("s{}", i), 1))
            .collect();
        let aggregator =
            SearchAggregator::new(registry_with(sources)).with_max_concurrency(2);

        let results = aggregator
            .search(&SearchFilters::from("query"), 1)
            .await
            .unwrap();
        assert_eq!(results.results.len(), 10);
        assert_eq!(results.total_count, 10);
    }
}
