// crates/rowbind-core/src/cache/tests.rs
// ============================================================================
// Module: Namespace Cache Tests
// Description: Unit tests for eviction, flushing, blocking, and shared use.
// Purpose: Validate cache policies applied by namespace caches.
// Dependencies: rowbind-core, serde_json
// ============================================================================

//! ## Overview
//! Drives [`NamespaceCache`] through each policy knob with small capacities.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;

use super::CacheError;
use super::NamespaceCache;
use crate::core::cache_policy::CachePolicy;
use crate::core::cache_policy::Eviction;
use crate::core::identifiers::Namespace;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn cache(policy: CachePolicy) -> NamespaceCache {
    NamespaceCache::new(Namespace::new("blog").unwrap(), policy).unwrap()
}

fn sized(eviction: Eviction, capacity: usize) -> CachePolicy {
    CachePolicy {
        eviction,
        capacity,
        ..CachePolicy::default()
    }
}

// ============================================================================
// SECTION: Eviction Tests
// ============================================================================

#[test]
fn lru_evicts_least_recently_read() {
    let cache = cache(sized(Eviction::Lru, 2));
    cache.put("a", json!(1)).unwrap();
    cache.put("b", json!(2)).unwrap();
    assert_eq!(cache.get("a").unwrap(), Some(json!(1)));
    cache.put("c", json!(3)).unwrap();
    assert_eq!(cache.get("b").unwrap(), None);
    assert_eq!(cache.get("a").unwrap(), Some(json!(1)));
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn fifo_evicts_oldest_insert() {
    let cache = cache(sized(Eviction::Fifo, 2));
    cache.put("a", json!(1)).unwrap();
    cache.put("b", json!(2)).unwrap();
    assert_eq!(cache.get("a").unwrap(), Some(json!(1)));
    cache.put("c", json!(3)).unwrap();
    assert_eq!(cache.get("a").unwrap(), None);
    assert_eq!(cache.get("b").unwrap(), Some(json!(2)));
}

#[test]
fn replacing_a_key_does_not_evict() {
    let cache = cache(sized(Eviction::Fifo, 1));
    cache.put("a", json!(1)).unwrap();
    cache.put("a", json!(2)).unwrap();
    assert_eq!(cache.get("a").unwrap(), Some(json!(2)));
}

#[test]
fn zero_capacity_is_rejected() {
    let err = NamespaceCache::new(Namespace::new("blog").unwrap(), sized(Eviction::Lru, 0)).unwrap_err();
    assert_eq!(err, CacheError::InvalidCapacity {
        cache: "blog".to_string(),
    });
}

// ============================================================================
// SECTION: Policy Tests
// ============================================================================

#[test]
fn read_write_and_read_only_return_equal_values() {
    let value = json!({"title": "Rust", "tags": ["a", "b"]});
    for read_only in [false, true] {
        let cache = cache(CachePolicy {
            read_only,
            ..CachePolicy::default()
        });
        cache.put("k", value.clone()).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(value.clone()));
    }
}

#[test]
fn scheduled_flush_clears_after_interval() {
    let cache = cache(CachePolicy {
        flush_interval: Some(Duration::from_millis(20)),
        ..CachePolicy::default()
    });
    cache.put("a", json!(1)).unwrap();
    thread::sleep(Duration::from_millis(40));
    assert_eq!(cache.get("a").unwrap(), None);
    assert!(cache.is_empty().unwrap());
}

#[test]
fn hit_ratio_counts_requests() {
    let cache = cache(CachePolicy::default());
    cache.put("a", json!(1)).unwrap();
    cache.get("a").unwrap();
    cache.get("missing").unwrap();
    let ratio = cache.hit_ratio().unwrap();
    assert!((ratio - 0.5).abs() < f64::EPSILON);
}

#[test]
fn clear_and_remove_drop_entries() {
    let cache = cache(CachePolicy::default());
    cache.put("a", json!(1)).unwrap();
    cache.put("b", json!(2)).unwrap();
    assert_eq!(cache.remove("a").unwrap(), Some(json!(1)));
    cache.clear().unwrap();
    assert!(cache.is_empty().unwrap());
}

// ============================================================================
// SECTION: Blocking Tests
// ============================================================================

#[test]
fn blocking_miss_waits_for_loader() {
    let cache = Arc::new(cache(CachePolicy {
        blocking: true,
        ..CachePolicy::default()
    }));
    assert_eq!(cache.get("k").unwrap(), None);
    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.get("k").unwrap())
    };
    thread::sleep(Duration::from_millis(30));
    cache.put("k", json!("loaded")).unwrap();
    assert_eq!(reader.join().unwrap(), Some(json!("loaded")));
}

#[test]
fn release_unblocks_waiters_without_value() {
    let cache = Arc::new(cache(CachePolicy {
        blocking: true,
        ..CachePolicy::default()
    }));
    assert_eq!(cache.get("k").unwrap(), None);
    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let found = cache.get("k").unwrap();
            cache.release("k").unwrap();
            found
        })
    };
    thread::sleep(Duration::from_millis(30));
    cache.release("k").unwrap();
    assert_eq!(reader.join().unwrap(), None);
}

#[test]
fn remove_unblocks_waiters_on_the_key() {
    let cache = Arc::new(cache(CachePolicy {
        blocking: true,
        ..CachePolicy::default()
    }));
    assert_eq!(cache.get("k").unwrap(), None);
    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let found = cache.get("k").unwrap();
            cache.release("k").unwrap();
            found
        })
    };
    thread::sleep(Duration::from_millis(30));
    assert_eq!(cache.remove("k").unwrap(), None);
    assert_eq!(reader.join().unwrap(), None);
}

// ============================================================================
// SECTION: Shared Use Tests
// ============================================================================

#[test]
fn concurrent_readers_and_loaders_keep_statistics_consistent() {
    const THREADS: u32 = 8;
    const OPERATIONS: u32 = 400;
    const KEYS: u32 = 16;
    const CAPACITY: usize = 4;

    for blocking in [false, true] {
        let cache = Arc::new(cache(CachePolicy {
            blocking,
            ..sized(Eviction::Lru, CAPACITY)
        }));
        let workers: Vec<_> = (0 .. THREADS)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let mut hits = 0_u32;
                    for operation in 0 .. OPERATIONS {
                        let key = format!("k{}", (worker * 7 + operation * 3) % KEYS);
                        match cache.get(&key).unwrap() {
                            Some(value) => {
                                assert_eq!(value, json!(key));
                                hits += 1;
                            }
                            None => cache.put(key.clone(), json!(key)).unwrap(),
                        }
                        assert!(cache.len().unwrap() <= CAPACITY);
                    }
                    hits
                })
            })
            .collect();
        let hits: u32 = workers.into_iter().map(|worker| worker.join().unwrap()).sum();

        let expected = f64::from(hits) / f64::from(THREADS * OPERATIONS);
        assert!((cache.hit_ratio().unwrap() - expected).abs() < f64::EPSILON);
        assert!(cache.len().unwrap() <= CAPACITY);
    }
}
