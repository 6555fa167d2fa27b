// crates/rowbind-config/src/pending/tests.rs
// ============================================================================
// Module: Reference Resolver Tests
// Description: Unit tests for deferred item replay.
// Purpose: Validate ordering, removal, and fatal-error handling of retries.
// Dependencies: rowbind-config
// ============================================================================

//! ## Overview
//! Drives a queue of integer items against a growing set of known ids.

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

use std::collections::BTreeSet;

use rowbind_core::QualifiedId;
use rowbind_core::UnitId;

use super::PendingQueue;
use super::Resolution;
use super::Unmet;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn waiting(id: u32) -> Unmet {
    Unmet::ResultShape(QualifiedId::raw(format!("ns.s{id}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn retry_visits_items_in_insertion_order() {
    let mut queue = PendingQueue::new("result map");
    for item in [3_u32, 1, 2] {
        queue.defer(item, UnitId::new("unit"), waiting(item));
    }
    let mut visited = Vec::new();
    let resolved = queue
        .retry_all(|item, _| {
            visited.push(*item);
            Ok::<_, ()>(Resolution::Pending(waiting(*item)))
        })
        .unwrap();
    assert_eq!(visited, vec![3, 1, 2]);
    assert_eq!(resolved, 0);
    assert_eq!(queue.len(), 3);
}

#[test]
fn chain_resolves_over_repeated_passes() {
    // item n depends on item n - 1; inserted in reverse so each pass resolves one.
    let mut queue = PendingQueue::new("result map");
    for item in (1_u32 ..= 4).rev() {
        queue.defer(item, UnitId::new("unit"), waiting(item - 1));
    }
    let mut known: BTreeSet<u32> = BTreeSet::from([0]);
    let mut passes = 0;
    while !queue.is_empty() {
        passes += 1;
        let resolved = queue
            .retry_all(|item, _| {
                if known.contains(&(item - 1)) {
                    known.insert(*item);
                    Ok::<_, ()>(Resolution::Ready(()))
                } else {
                    Ok(Resolution::Pending(waiting(item - 1)))
                }
            })
            .unwrap();
        assert!(resolved > 0, "no progress on pass {passes}");
    }
    assert_eq!(passes, 4);
}

#[test]
fn fatal_error_keeps_unattempted_items() {
    let mut queue = PendingQueue::new("statement");
    for item in [1_u32, 2, 3] {
        queue.defer(item, UnitId::new("unit"), waiting(item));
    }
    let err = queue
        .retry_all(|item, _| if *item == 2 { Err("boom") } else { Ok(Resolution::Ready(())) })
        .unwrap_err();
    assert_eq!(err, "boom");
    assert_eq!(queue.len(), 2);
}

#[test]
fn describe_names_unit_and_dependency() {
    let mut queue = PendingQueue::new("cache-ref");
    queue.defer((), UnitId::new("blog.toml"), waiting(7));
    assert_eq!(queue.describe(), vec!["cache-ref in blog.toml waiting for result map ns.s7".to_string()]);
}
