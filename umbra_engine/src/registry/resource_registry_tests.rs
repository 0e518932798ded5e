/// Tests for ResourceRegistry
///
/// These tests validate add/get/present, error propagation, replacement
/// and exactly-once release.

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts drops to check release semantics
struct Tracked {
    drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn tracked(drops: &Arc<AtomicUsize>) -> Arc<Tracked> {
    Arc::new(Tracked { drops: Arc::clone(drops) })
}

// ============================================================================
// Tests: add / get / present
// ============================================================================

#[test]
fn test_new_registry_is_empty() {
    let registry: ResourceRegistry<String, Arc<u32>> = ResourceRegistry::new("texture");
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_present_before_and_after_add() {
    let mut registry: ResourceRegistry<String, Arc<u32>> = ResourceRegistry::new("texture");
    assert!(!registry.present("wall.dds"));
    registry.add("wall.dds".to_string(), || Ok(Arc::new(1))).unwrap();
    assert!(registry.present("wall.dds"));
}

#[test]
fn test_get_returns_exact_handle() {
    let mut registry: ResourceRegistry<String, Arc<u32>> = ResourceRegistry::new("texture");
    let added = registry.add("a".to_string(), || Ok(Arc::new(7))).unwrap();
    let fetched = registry.get("a").unwrap();
    assert!(Arc::ptr_eq(&added, fetched));
}

#[test]
fn test_get_missing_returns_none() {
    let registry: ResourceRegistry<String, Arc<u32>> = ResourceRegistry::new("texture");
    assert!(registry.get("missing").is_none());
}

#[test]
fn test_require_missing_is_error() {
    let registry: ResourceRegistry<String, Arc<u32>> = ResourceRegistry::new("pipeline");
    assert!(matches!(registry.require("missing"), Err(Error::InvalidResource(_))));
}

#[test]
fn test_creation_error_propagates_and_leaves_registry_unchanged() {
    let mut registry: ResourceRegistry<String, Arc<u32>> = ResourceRegistry::new("pipeline");
    let result = registry.add("broken".to_string(), || Err(Error::OutOfMemory));
    assert_eq!(result.err(), Some(Error::OutOfMemory));
    assert!(!registry.present("broken"));
}

// ============================================================================
// Tests: Replacement and release
// ============================================================================

#[test]
fn test_readd_replaces_and_releases_previous() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut registry = ResourceRegistry::new("pipeline");

    registry.add("p".to_string(), || Ok(tracked(&drops))).unwrap();
    let second = registry.add("p".to_string(), || Ok(tracked(&drops))).unwrap();

    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    assert!(Arc::ptr_eq(registry.get("p").unwrap(), &second));
}

#[test]
fn test_drop_releases_every_entry_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    {
        let mut registry = ResourceRegistry::new("texture");
        for name in ["a", "b", "c"] {
            registry.add(name.to_string(), || Ok(tracked(&drops))).unwrap();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 0);
    }
    assert_eq!(drops.load(Ordering::SeqCst), 3);
}

#[test]
fn test_remove_and_clear() {
    let mut registry: ResourceRegistry<u32, Arc<u32>> = ResourceRegistry::new("set");
    registry.insert(1, Arc::new(1));
    registry.insert(2, Arc::new(2));
    assert!(registry.remove(&1).is_some());
    assert!(registry.remove(&1).is_none());
    assert_eq!(registry.keys(), vec![&2]);
    registry.clear();
    assert!(registry.is_empty());
}
