//! Registry behavior: registration, duplicate rejection, enable/disable,
//! and snapshot semantics.

use std::sync::Arc;

use hondana::Error;
use hondana::registry::SourceRegistry;

mod common;
use common::MockSource;

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_register_then_get_all_contains_source_once() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("alpha"))).unwrap();

        let all = registry.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), "alpha");
    }

    #[test]
    fn test_duplicate_registration_fails_and_leaves_registry_unchanged() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("alpha"))).unwrap();
        registry.set_enabled("alpha", false).unwrap();

        let err = registry
            .register(Arc::new(MockSource::new("alpha")))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSourceId(id) if id == "alpha"));

        // The original registration keeps its state
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.is_enabled("alpha"), Some(false));
    }

    #[test]
    fn test_disable_removes_from_enabled_but_not_from_all() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("alpha"))).unwrap();
        registry.register(Arc::new(MockSource::new("beta"))).unwrap();

        registry.set_enabled("alpha", false).unwrap();

        let enabled = registry.get_enabled();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id(), "beta");
        assert_eq!(registry.get_all().len(), 2);
        assert!(registry.get_by_id("alpha").is_some());

        registry.set_enabled("alpha", true).unwrap();
        assert_eq!(registry.get_enabled().len(), 2);
    }

    #[test]
    fn test_enabled_is_subset_of_all() {
        let registry = SourceRegistry::new();
        for id in ["a", "b", "c"] {
            registry.register(Arc::new(MockSource::new(id))).unwrap();
        }
        registry.set_enabled("b", false).unwrap();

        let all: Vec<String> = registry.get_all().iter().map(|s| s.id().to_string()).collect();
        for source in registry.get_enabled() {
            assert!(all.contains(&source.id().to_string()));
        }
    }

    #[test]
    fn test_set_enabled_unknown_source_fails() {
        let registry = SourceRegistry::new();
        let err = registry.set_enabled("ghost", true).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_unregister_removes_source() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("alpha"))).unwrap();

        let removed = registry.unregister("alpha").unwrap();
        assert_eq!(removed.id(), "alpha");
        assert!(registry.is_empty());
        assert!(registry.get_by_id("alpha").is_none());

        let err = registry.unregister("alpha").unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn test_id_can_be_reused_after_unregister() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("alpha"))).unwrap();
        registry.unregister("alpha").unwrap();
        registry.register(Arc::new(MockSource::new("alpha"))).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshots_are_idempotent_without_mutation() {
        let registry = SourceRegistry::new();
        for id in ["a", "b"] {
            registry.register(Arc::new(MockSource::new(id))).unwrap();
        }

        let first: Vec<String> = registry
            .get_enabled()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        let second: Vec<String> = registry
            .get_enabled()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_mutation() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("a"))).unwrap();

        let snapshot = registry.get_all();
        registry.register(Arc::new(MockSource::new("b"))).unwrap();
        registry.unregister("a").unwrap();

        // The earlier snapshot still holds its own copy
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), "a");
    }

    #[test]
    fn test_register_with_disabled_flag() {
        let registry = SourceRegistry::new();
        registry
            .register_with(Arc::new(MockSource::new("alpha")), false)
            .unwrap();

        assert_eq!(registry.is_enabled("alpha"), Some(false));
        assert!(registry.get_enabled().is_empty());
        assert_eq!(registry.get_all().len(), 1);
    }

    #[test]
    fn test_descriptors_reflect_enabled_flag() {
        let registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("a"))).unwrap();
        registry.register_with(Arc::new(MockSource::new("b")), false).unwrap();

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].id, "a");
        assert!(descriptors[0].enabled);
        assert_eq!(descriptors[1].id, "b");
        assert!(!descriptors[1].enabled);
        assert!(!descriptors[0].capabilities.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_of_distinct_ids() {
        let registry = Arc::new(SourceRegistry::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register(Arc::new(MockSource::new(&format!("src-{}", i))))
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(registry.len(), 16);
        assert_eq!(registry.get_enabled().len(), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_registration_admits_exactly_one() {
        let registry = Arc::new(SourceRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register(Arc::new(MockSource::new("contested")))
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(registry.len(), 1);
    }
}
