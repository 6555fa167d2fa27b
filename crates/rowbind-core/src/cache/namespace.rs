// crates/rowbind-core/src/cache/namespace.rs
// ============================================================================
// Module: Rowbind Namespace Cache
// Description: Thread-safe cache instance owned by one or more namespaces.
// Purpose: Apply a cache policy with a single lock per instance.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! A [`NamespaceCache`] is created once per cache declaration and shared by
//! every namespace that references it, so one `Arc` may serve several
//! namespaces. All state sits behind one mutex: scheduled flushing, copy
//! semantics, hit statistics, and blocking misses compose inside that lock.
//!
//! Blocking: a miss marks the key in flight. Other readers of the same key
//! wait until the loader calls [`NamespaceCache::put`],
//! [`NamespaceCache::remove`] or [`NamespaceCache::release`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::cache::CacheError;
use crate::cache::store::EvictingStore;
use crate::cache::store::StoredValue;
use crate::core::cache_policy::CachePolicy;
use crate::core::identifiers::Namespace;

// ============================================================================
// SECTION: Cache State
// ============================================================================

/// Mutable cache state guarded by the instance lock.
#[derive(Debug)]
struct CacheState {
    /// Entry store.
    store: EvictingStore,
    /// Time of the last clear.
    last_clear: Instant,
    /// Total `get` calls.
    requests: u64,
    /// `get` calls that found a value.
    hits: u64,
    /// Keys with a pending loader (blocking caches only).
    in_flight: BTreeSet<String>,
}

// ============================================================================
// SECTION: Namespace Cache
// ============================================================================

/// Shared cache instance.
///
/// # Invariants
/// - `policy.capacity >= 1`.
/// - Read-write caches never hand out values aliased with stored state.
#[derive(Debug)]
pub struct NamespaceCache {
    /// Namespace that declared the cache.
    id: Namespace,
    /// Declared policy.
    policy: CachePolicy,
    /// Guarded state.
    state: Mutex<CacheState>,
    /// Signalled when an in-flight key is put, removed, or released.
    released: Condvar,
}

impl NamespaceCache {
    /// Creates a cache for `id` from `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidCapacity`] when `policy.capacity` is zero.
    pub fn new(id: Namespace, policy: CachePolicy) -> Result<Self, CacheError> {
        if policy.capacity == 0 {
            return Err(CacheError::InvalidCapacity {
                cache: id.to_string(),
            });
        }
        let state = CacheState {
            store: EvictingStore::new(policy.eviction, policy.capacity),
            last_clear: Instant::now(),
            requests: 0,
            hits: 0,
            in_flight: BTreeSet::new(),
        };
        Ok(Self {
            id,
            policy,
            state: Mutex::new(state),
            released: Condvar::new(),
        })
    }

    /// Returns the declaring namespace.
    #[must_use]
    pub const fn id(&self) -> &Namespace {
        &self.id
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Looks up a value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the lock is poisoned or a stored copy
    /// cannot be decoded.
    pub fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut state = self.lock()?;
        if self.policy.blocking {
            while state.in_flight.contains(key) {
                state = self.released.wait(state).map_err(|_| self.poisoned())?;
            }
        }
        self.flush_if_due(&mut state);
        let found = match state.store.get(key) {
            Some(stored) => Some(stored.decode(self.id.as_str())?),
            None => None,
        };
        state.requests = state.requests.saturating_add(1);
        if found.is_some() {
            state.hits = state.hits.saturating_add(1);
        } else if self.policy.blocking {
            state.in_flight.insert(key.to_string());
        }
        debug!(
            cache = %self.id,
            ratio = ratio(state.hits, state.requests),
            "cache hit ratio"
        );
        Ok(found)
    }

    /// Stores a value and wakes readers waiting on the key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the lock is poisoned or the value cannot be
    /// serialized.
    pub fn put(&self, key: impl Into<String>, value: Value) -> Result<(), CacheError> {
        let key = key.into();
        let stored = StoredValue::encode(value, self.policy.is_read_write(), self.id.as_str())?;
        let mut state = self.lock()?;
        self.flush_if_due(&mut state);
        state.in_flight.remove(&key);
        if let Some(evicted) = state.store.insert(key, stored) {
            debug!(cache = %self.id, key = %evicted, "cache entry evicted");
        }
        drop(state);
        self.released.notify_all();
        Ok(())
    }

    /// Removes a value and wakes readers waiting on the key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the lock is poisoned or the removed copy
    /// cannot be decoded.
    pub fn remove(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut state = self.lock()?;
        let removed = state.store.remove(key);
        state.in_flight.remove(key);
        drop(state);
        self.released.notify_all();
        removed.map(|stored| stored.decode(self.id.as_str())).transpose()
    }

    /// Releases an in-flight key without storing a value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] when the lock is poisoned.
    pub fn release(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        state.in_flight.remove(key);
        drop(state);
        self.released.notify_all();
        Ok(())
    }

    /// Removes every value and restarts the flush interval.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] when the lock is poisoned.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        state.store.clear();
        state.last_clear = Instant::now();
        Ok(())
    }

    /// Returns the number of stored values.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] when the lock is poisoned.
    pub fn len(&self) -> Result<usize, CacheError> {
        let mut state = self.lock()?;
        self.flush_if_due(&mut state);
        Ok(state.store.len())
    }

    /// Returns true when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] when the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Returns hits divided by requests, or zero before the first request.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] when the lock is poisoned.
    pub fn hit_ratio(&self) -> Result<f64, CacheError> {
        let state = self.lock()?;
        Ok(ratio(state.hits, state.requests))
    }

    /// Acquires the state lock.
    fn lock(&self) -> Result<MutexGuard<'_, CacheState>, CacheError> {
        self.state.lock().map_err(|_| self.poisoned())
    }

    /// Builds the poisoned-lock error.
    fn poisoned(&self) -> CacheError {
        CacheError::Poisoned {
            cache: self.id.to_string(),
        }
    }

    /// Clears the store when the flush interval elapsed.
    fn flush_if_due(&self, state: &mut CacheState) {
        let Some(interval) = self.policy.flush_interval else {
            return;
        };
        if state.last_clear.elapsed() >= interval {
            state.store.clear();
            state.last_clear = Instant::now();
            debug!(cache = %self.id, "scheduled cache flush");
        }
    }
}

/// Computes a hit ratio.
#[allow(clippy::cast_precision_loss, reason = "Ratio is a diagnostic approximation.")]
fn ratio(hits: u64, requests: u64) -> f64 {
    if requests == 0 { 0.0 } else { hits as f64 / requests as f64 }
}
