// crates/rowbind-config/src/mapper.rs
// ============================================================================
// Module: Rowbind Mapping Unit Parser
// Description: Walks one mapping unit and registers its declarations.
// Purpose: Apply declaration order, database shadowing, and deferral.
// Dependencies: rowbind-core, tracing
// ============================================================================

//! ## Overview
//! A mapping unit is processed in a fixed order: cache reference, cache,
//! parameter shapes, result shapes, SQL fragments, statements. Fragments and
//! statements are read in two passes so declarations for the active database
//! shadow unqualified ones with the same id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rowbind_core::DatabaseId;
use rowbind_core::Namespace;
use rowbind_core::Node;
use rowbind_core::UnitId;
use tracing::debug;
use tracing::trace;

use crate::cache_builder;
use crate::configuration::CacheRefTask;
use crate::configuration::Configuration;
use crate::configuration::Fragment;
use crate::error::MappingError;
use crate::pending::Resolution;
use crate::shape;
use crate::shape::ShapeTask;
use crate::statement::STATEMENT_ELEMENTS;
use crate::statement::StatementTask;

// ============================================================================
// SECTION: Unit Parser
// ============================================================================

/// Parses a mapping unit whose variables are already substituted.
///
/// # Errors
///
/// Returns [`MappingError`] for any invalid declaration.
pub(crate) fn parse_unit(config: &mut Configuration, unit: &UnitId, root: &Node) -> Result<(), MappingError> {
    let namespace =
        Namespace::new(root.attr("namespace").unwrap_or_default()).map_err(|_| MappingError::EmptyNamespace)?;
    debug!(unit = %unit, namespace = %namespace, "parsing mapping unit");

    let cache_ref = root.child("cache-ref");
    let cache = root.child("cache");
    if cache_ref.is_some() && cache.is_some() {
        return Err(MappingError::CacheAndCacheRef {
            namespace: namespace.to_string(),
        });
    }
    if let Some(cache_ref) = cache_ref {
        let task = CacheRefTask {
            namespace: namespace.clone(),
            target: Namespace::new(cache_ref.require_attr("namespace")?)?,
        };
        if let Resolution::Pending(unmet) = config.attempt_cache_ref(&task, unit)? {
            config.unresolved_cache_refs.insert(namespace.clone(), task.target.clone());
            config.pending.cache_refs.defer(task, unit.clone(), unmet);
        }
    }
    if let Some(cache) = cache {
        let built = cache_builder::build_cache(&namespace, cache, config.aliases())?;
        config.register_cache(namespace.clone(), built)?;
    }

    for node in root.children_named("parameterMap") {
        let parameters = shape::build_parameter_map(config, &namespace, node)?;
        config.parameter_shapes.insert(parameters.id.clone(), parameters)?;
    }

    for node in root.children_named("resultMap") {
        let task = ShapeTask {
            namespace: namespace.clone(),
            node: node.clone(),
        };
        if let Resolution::Pending(unmet) = config.attempt_shape(&task, unit)? {
            config.pending.shapes.defer(task, unit.clone(), unmet);
        }
    }

    let active = config.database_id().cloned();
    if let Some(active) = &active {
        register_fragments(config, &namespace, root, Some(active))?;
    }
    register_fragments(config, &namespace, root, None)?;

    if let Some(active) = &active {
        register_statements(config, unit, &namespace, root, Some(active))?;
    }
    register_statements(config, unit, &namespace, root, None)
}

// ============================================================================
// SECTION: Database Passes
// ============================================================================

/// Returns true when `node` belongs to the pass for `database`.
fn in_pass(node: &Node, database: Option<&DatabaseId>) -> bool {
    match (node.attr("databaseId"), database) {
        (Some(declared), Some(active)) => declared == active.as_str(),
        (None, None) => true,
        _ => false,
    }
}

/// Registers `sql` fragments of one database pass.
fn register_fragments(
    config: &mut Configuration,
    namespace: &Namespace,
    root: &Node,
    database: Option<&DatabaseId>,
) -> Result<(), MappingError> {
    for node in root.children_named("sql").filter(|node| in_pass(node, database)) {
        let id = namespace.declare(node.require_attr("id")?)?;
        if database.is_none()
            && config.sql_fragments.get(&id).is_some_and(|existing| existing.database_id.is_some())
        {
            trace!(fragment = %id, "unqualified fragment shadowed by database-specific fragment");
            continue;
        }
        config.sql_fragments.insert(id, Fragment {
            node: node.clone(),
            database_id: database.cloned(),
        });
    }
    Ok(())
}

/// Builds or defers statements of one database pass.
fn register_statements(
    config: &mut Configuration,
    unit: &UnitId,
    namespace: &Namespace,
    root: &Node,
    database: Option<&DatabaseId>,
) -> Result<(), MappingError> {
    for node in root.children_named(STATEMENT_ELEMENTS).filter(|node| in_pass(node, database)) {
        let id = namespace.declare(node.require_attr("id")?)?;
        if database.is_some() {
            config.database_specific.insert(id);
        } else if config.database_specific.contains(&id) {
            trace!(statement = %id, "unqualified statement shadowed by database-specific statement");
            continue;
        }
        let task = StatementTask {
            namespace: namespace.clone(),
            node: node.clone(),
        };
        if let Resolution::Pending(unmet) = config.attempt_statement(&task, unit)? {
            config.pending.statements.defer(task, unit.clone(), unmet);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
