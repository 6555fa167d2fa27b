// crates/rowbind-core/src/core/cache_policy.rs
// ============================================================================
// Module: Rowbind Cache Policy
// Description: Declarative per-namespace cache configuration.
// Purpose: Describe eviction, capacity, copy semantics, flushing, and blocking.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`CachePolicy`] is the parsed form of a namespace's cache declaration.
//! The runtime cache in [`crate::cache`] is constructed from it. A bare
//! declaration yields [`CachePolicy::default`]: LRU eviction, 1024 entries,
//! read-write, no scheduled flush, non-blocking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default entry capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Built-in store implementation name.
pub const PERPETUAL: &str = "PERPETUAL";

// ============================================================================
// SECTION: Eviction
// ============================================================================

/// Entry eviction strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Eviction {
    /// Evict the least recently used entry.
    #[default]
    Lru,
    /// Evict the oldest inserted entry.
    Fifo,
}

impl Eviction {
    /// Parses `LRU` or `FIFO`, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LRU" => Some(Self::Lru),
            "FIFO" => Some(Self::Fifo),
            _ => None,
        }
    }
}

impl fmt::Display for Eviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lru => "LRU",
            Self::Fifo => "FIFO",
        })
    }
}

// ============================================================================
// SECTION: Cache Policy
// ============================================================================

/// Parsed cache declaration.
///
/// # Invariants
/// - `capacity` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Eviction strategy.
    pub eviction: Eviction,
    /// Maximum number of entries.
    pub capacity: usize,
    /// Entries are shared as immutable values instead of copied on read.
    pub read_only: bool,
    /// Clear the cache when this much time passed since the last clear.
    #[serde(with = "duration_millis")]
    pub flush_interval: Option<Duration>,
    /// Concurrent misses on one key wait for the first loader.
    pub blocking: bool,
    /// Additional key-value configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            eviction: Eviction::Lru,
            capacity: DEFAULT_CAPACITY,
            read_only: false,
            flush_interval: None,
            blocking: false,
            properties: BTreeMap::new(),
        }
    }
}

impl CachePolicy {
    /// Returns true when reads hand out copies.
    #[must_use]
    pub const fn is_read_write(&self) -> bool {
        !self.read_only
    }
}

/// Serializes optional durations as whole milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    /// Writes the duration as milliseconds.
    #[allow(clippy::ref_option, reason = "Signature is fixed by serde's `with` protocol.")]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    /// Reads milliseconds into a duration.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
