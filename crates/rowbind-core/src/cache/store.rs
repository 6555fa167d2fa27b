// crates/rowbind-core/src/cache/store.rs
// ============================================================================
// Module: Rowbind Cache Store
// Description: Bounded entry store with LRU or FIFO eviction.
// Purpose: Hold cache entries under a capacity limit.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The innermost layer of a namespace cache. Entries are ordered by a
//! monotonically increasing tick: insertion time for FIFO, last access for
//! LRU. The store is not synchronized; the owning cache holds it behind a
//! single lock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::CacheError;
use crate::core::cache_policy::Eviction;

// ============================================================================
// SECTION: Stored Values
// ============================================================================

/// Cached value representation.
#[derive(Debug, Clone)]
pub enum StoredValue {
    /// Serialized copy, deserialized on every read.
    Serialized(String),
    /// Shared immutable value.
    Shared(Arc<Value>),
}

impl StoredValue {
    /// Stores `value` as a serialized copy or a shared value.
    pub fn encode(value: Value, copy_on_read: bool, cache: &str) -> Result<Self, CacheError> {
        if !copy_on_read {
            return Ok(Self::Shared(Arc::new(value)));
        }
        serde_json::to_string(&value).map(Self::Serialized).map_err(|err| {
            CacheError::Serialization {
                cache: cache.to_string(),
                message: err.to_string(),
            }
        })
    }

    /// Produces an owned value for a reader.
    pub fn decode(&self, cache: &str) -> Result<Value, CacheError> {
        match self {
            Self::Serialized(text) => {
                serde_json::from_str(text).map_err(|err| CacheError::Serialization {
                    cache: cache.to_string(),
                    message: err.to_string(),
                })
            }
            Self::Shared(value) => Ok(Value::clone(value)),
        }
    }
}

// ============================================================================
// SECTION: Evicting Store
// ============================================================================

/// Stored entry with its ordering tick.
#[derive(Debug)]
struct Slot {
    /// Stored value.
    value: StoredValue,
    /// Ordering tick.
    tick: u64,
}

/// Capacity-bounded store.
///
/// # Invariants
/// - `order` holds exactly one tick per key in `entries`.
/// - `entries.len() <= capacity` after every insert.
#[derive(Debug)]
pub struct EvictingStore {
    /// Eviction strategy.
    eviction: Eviction,
    /// Maximum entries.
    capacity: usize,
    /// Entries by key.
    entries: BTreeMap<String, Slot>,
    /// Tick to key, oldest first.
    order: BTreeMap<u64, String>,
    /// Next tick.
    next_tick: u64,
}

impl EvictingStore {
    /// Creates an empty store.
    pub const fn new(eviction: Eviction, capacity: usize) -> Self {
        Self {
            eviction,
            capacity,
            entries: BTreeMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }

    /// Returns an entry, refreshing its position under LRU.
    pub fn get(&mut self, key: &str) -> Option<&StoredValue> {
        if self.eviction == Eviction::Lru && self.entries.contains_key(key) {
            self.touch(key);
        }
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Inserts an entry, returning the key evicted to make room.
    pub fn insert(&mut self, key: String, value: StoredValue) -> Option<String> {
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.value = value;
            if self.eviction == Eviction::Lru {
                self.touch(&key);
            }
            return None;
        }
        let tick = self.advance();
        self.order.insert(tick, key.clone());
        self.entries.insert(key, Slot {
            value,
            tick,
        });
        if self.entries.len() <= self.capacity {
            return None;
        }
        let (_, evicted) = self.order.pop_first()?;
        self.entries.remove(&evicted);
        Some(evicted)
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &str) -> Option<StoredValue> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        Some(slot.value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Moves `key` to the most recent position.
    fn touch(&mut self, key: &str) {
        let tick = self.advance();
        if let Some(slot) = self.entries.get_mut(key) {
            self.order.remove(&slot.tick);
            slot.tick = tick;
            self.order.insert(tick, key.to_string());
        }
    }

    /// Returns the next ordering tick.
    const fn advance(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick = self.next_tick.wrapping_add(1);
        tick
    }
}
