// crates/rowbind-config/src/cache_builder.rs
// ============================================================================
// Module: Rowbind Cache Declarations
// Description: Turns a namespace `cache` element into a cache policy.
// Purpose: Validate cache attributes before a shared cache is created.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! A `cache` element names an implementation, an eviction strategy, and the
//! policy knobs. Only the built-in perpetual store is available; any other
//! implementation or eviction name is rejected rather than silently replaced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use rowbind_core::AliasRegistry;
use rowbind_core::CacheError;
use rowbind_core::CachePolicy;
use rowbind_core::DEFAULT_CAPACITY;
use rowbind_core::Eviction;
use rowbind_core::Namespace;
use rowbind_core::NamespaceCache;
use rowbind_core::Node;
use rowbind_core::PERPETUAL;

use crate::error::MappingError;

// ============================================================================
// SECTION: Cache Builder
// ============================================================================

/// Parses the policy declared by a `cache` element.
///
/// # Errors
///
/// Returns [`MappingError`] for unsupported implementations or evictions and
/// for malformed numeric or boolean attributes.
pub fn cache_policy(node: &Node, aliases: &AliasRegistry) -> Result<CachePolicy, MappingError> {
    let implementation = aliases.resolve(node.attr_or("type", PERPETUAL));
    if implementation.as_ref().is_some_and(|name| name.as_str() != PERPETUAL) {
        return Err(CacheError::UnsupportedImplementation {
            name: node.attr_or("type", PERPETUAL).to_string(),
        }
        .into());
    }
    let eviction_name = node.attr_or("eviction", "LRU");
    let eviction = aliases
        .resolve(eviction_name)
        .and_then(|resolved| Eviction::parse(resolved.as_str()))
        .ok_or_else(|| CacheError::UnsupportedEviction {
            name: eviction_name.to_string(),
        })?;
    let capacity = match node.u64_attr("size")? {
        Some(size) => usize::try_from(size).map_err(|_| MappingError::Unsupported {
            element: node.name.clone(),
            attribute: "size".to_string(),
            value: size.to_string(),
        })?,
        None => DEFAULT_CAPACITY,
    };
    Ok(CachePolicy {
        eviction,
        capacity,
        read_only: node.bool_attr("readOnly")?.unwrap_or(false),
        flush_interval: node.u64_attr("flushInterval")?.map(Duration::from_millis),
        blocking: node.bool_attr("blocking")?.unwrap_or(false),
        properties: node.children_as_properties()?,
    })
}

/// Builds the shared cache a namespace declares.
///
/// # Errors
///
/// Returns [`MappingError`] when the policy is invalid.
pub fn build_cache(namespace: &Namespace, node: &Node, aliases: &AliasRegistry) -> Result<NamespaceCache, MappingError> {
    let policy = cache_policy(node, aliases)?;
    Ok(NamespaceCache::new(namespace.clone(), policy)?)
}
