// crates/rowbind-core/src/cache/mod.rs
// ============================================================================
// Module: Rowbind Cache Runtime
// Description: Shared, lock-guarded caches built from cache policies.
// Purpose: Provide cache instances that namespaces own or reference.
// Dependencies: serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Runtime caches built from [`crate::core::CachePolicy`]. One
//! [`NamespaceCache`] is created per cache declaration; namespaces that
//! reference another namespace's cache hold a clone of the same `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Modules
// ============================================================================

mod namespace;
mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use namespace::NamespaceCache;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Cache construction and access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Cache lock was poisoned by a panicking holder.
    #[error("cache {cache} lock poisoned")]
    Poisoned {
        /// Cache id.
        cache: String,
    },
    /// Value could not be copied in or out of a read-write cache.
    #[error("cache {cache} cannot copy value: {message}")]
    Serialization {
        /// Cache id.
        cache: String,
        /// Serializer message.
        message: String,
    },
    /// Capacity was zero.
    #[error("cache {cache} capacity must be at least 1")]
    InvalidCapacity {
        /// Cache id.
        cache: String,
    },
    /// Custom cache implementation requested.
    #[error("unsupported cache implementation '{name}'")]
    UnsupportedImplementation {
        /// Implementation name.
        name: String,
    },
    /// Unknown or unsupported eviction strategy.
    #[error("unsupported cache eviction '{name}'")]
    UnsupportedEviction {
        /// Eviction name.
        name: String,
    },
}

#[cfg(test)]
mod tests;
