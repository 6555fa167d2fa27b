// crates/rowbind-config/src/statement.rs
// ============================================================================
// Module: Rowbind Statement Builder
// Description: Builds mapped statements from select/insert/update/delete nodes.
// Purpose: Expand fragments, bind shapes and caches, and apply defaults.
// Dependencies: rowbind-core, tracing
// ============================================================================

//! ## Overview
//! Statement bodies are assembled by splicing `include` fragments in place
//! (with per-include property substitution) and keeping every other element
//! as a dynamic node for the renderer. A statement waits while its namespace
//! has an unresolved cache reference, while an included fragment is missing,
//! or while a referenced parameter or result shape is unregistered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rowbind_core::BodySegment;
use rowbind_core::DatabaseId;
use rowbind_core::GeneratedKeys;
use rowbind_core::MappedStatement;
use rowbind_core::Namespace;
use rowbind_core::Node;
use rowbind_core::QualifiedId;
use rowbind_core::ResultShape;
use rowbind_core::SelectKey;
use rowbind_core::SqlSegment;
use rowbind_core::SqlTemplate;
use rowbind_core::StatementKind;
use rowbind_core::StatementType;
use rowbind_core::TEXT_NODE;
use rowbind_core::UnitId;
use rowbind_core::substitute_placeholders;
use tracing::trace;

use crate::configuration::Configuration;
use crate::error::MappingError;
use crate::pending::Resolution;
use crate::pending::Unmet;
use crate::pending::ready;
use crate::shape::split_list;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Element names that declare statements.
pub(crate) const STATEMENT_ELEMENTS: &str = "select|insert|update|delete";

/// Suffix of the shape synthesized from a `resultType` attribute.
const INLINE_SHAPE_SUFFIX: &str = "-Inline";

// ============================================================================
// SECTION: Tasks
// ============================================================================

/// Deferred statement element.
#[derive(Debug, Clone)]
pub(crate) struct StatementTask {
    /// Namespace of the declaring unit.
    pub(crate) namespace: Namespace,
    /// Element as written, variables substituted.
    pub(crate) node: Node,
}

/// Statement ready to be registered, with its synthesized inline shape.
#[derive(Debug, Clone)]
pub(crate) struct BuiltStatement {
    /// Completed descriptor.
    pub(crate) statement: MappedStatement,
    /// Shape derived from `resultType`, if any.
    pub(crate) inline_shape: Option<ResultShape>,
}

// ============================================================================
// SECTION: Statement Builder
// ============================================================================

/// Builds one statement element.
///
/// # Errors
///
/// Returns [`MappingError`] for invalid content; unregistered dependencies
/// are reported as [`Resolution::Pending`].
pub(crate) fn build_statement(
    config: &Configuration,
    unit: &UnitId,
    task: &StatementTask,
) -> Result<Resolution<BuiltStatement>, MappingError> {
    let node = &task.node;
    let namespace = &task.namespace;
    let kind = StatementKind::from_element(&node.name).ok_or_else(|| MappingError::Unsupported {
        element: node.name.clone(),
        attribute: "element".to_string(),
        value: node.name.clone(),
    })?;
    let id = namespace.declare(node.require_attr("id")?)?;
    if let Some(target) = config.unresolved_cache_ref(namespace) {
        return Ok(Resolution::Pending(Unmet::CacheRef(target.clone())));
    }

    let mut assembler = SqlAssembler {
        config,
        namespace,
        chain: Vec::new(),
    };
    let sql = ready!(assembler.template(node, true)?);
    let select_key = match node.child("selectKey") {
        Some(key) => Some(ready!(assembler.select_key(key)?)),
        None => None,
    };

    let parameter_shape = match node.attr("parameterMap") {
        Some(reference) => {
            let shape_id = namespace.reference(reference)?;
            if config.parameter_shapes().get_full(&shape_id).is_none() {
                return Ok(Resolution::Pending(Unmet::ParameterShape(shape_id)));
            }
            Some(shape_id)
        }
        None => None,
    };

    let mut result_shapes = Vec::new();
    let mut inline_shape = None;
    for reference in split_list(node.attr("resultMap")) {
        let shape_id = namespace.reference(&reference)?;
        if config.result_shapes().get_full(&shape_id).is_none() {
            return Ok(Resolution::Pending(Unmet::ResultShape(shape_id)));
        }
        result_shapes.push(shape_id);
    }
    if result_shapes.is_empty()
        && let Some(result_type) = config.aliases().resolve_opt(node.attr("resultType"))
    {
        let shape = ResultShape::inline(id.with_suffix(INLINE_SHAPE_SUFFIX), result_type);
        result_shapes.push(shape.id.clone());
        inline_shape = Some(shape);
    }

    let settings = config.settings();
    let statement_type = match node.attr("statementType") {
        Some(raw) => StatementType::parse(raw).ok_or_else(|| MappingError::Unsupported {
            element: node.name.clone(),
            attribute: "statementType".to_string(),
            value: raw.to_string(),
        })?,
        None => StatementType::Prepared,
    };
    let use_generated_keys = if select_key.is_some() {
        false
    } else {
        node.bool_attr("useGeneratedKeys")?
            .unwrap_or(settings.use_generated_keys && kind == StatementKind::Insert)
    };
    let key_source = node.child("selectKey").unwrap_or(node);
    let keys = GeneratedKeys {
        use_generated_keys,
        key_properties: split_list(key_source.attr("keyProperty")),
        key_columns: split_list(key_source.attr("keyColumn")),
        select_key,
    };
    let cache = if settings.cache_enabled { config.cache(namespace.as_str()).cloned() } else { None };
    trace!(statement = %id, kind = %kind, "built statement");
    Ok(Resolution::Ready(BuiltStatement {
        statement: MappedStatement {
            id,
            unit: unit.clone(),
            kind,
            statement_type,
            sql,
            result_shapes,
            parameter_shape,
            parameter_type: config.aliases().resolve_opt(node.attr("parameterType")),
            database_id: node.attr("databaseId").map(DatabaseId::new),
            fetch_size: node.u32_attr("fetchSize")?.or(settings.default_fetch_size),
            timeout: node.u32_attr("timeout")?.or(settings.default_statement_timeout),
            flush_cache: node.bool_attr("flushCache")?.unwrap_or(!kind.is_select()),
            use_cache: node.bool_attr("useCache")?.unwrap_or(kind.is_select()),
            result_ordered: node.bool_attr("resultOrdered")?.unwrap_or(false),
            result_sets: split_list(node.attr("resultSets")),
            keys,
            cache,
        },
        inline_shape,
    }))
}

// ============================================================================
// SECTION: SQL Assembly
// ============================================================================

/// Expands statement bodies, tracking the include chain for cycle detection.
struct SqlAssembler<'a> {
    /// Fragment registry and variables.
    config: &'a Configuration,
    /// Namespace fragment references are qualified against.
    namespace: &'a Namespace,
    /// Fragments currently being expanded, outermost first.
    chain: Vec<QualifiedId>,
}

impl SqlAssembler<'_> {
    /// Builds the template for a statement or key body.
    ///
    /// `skip_keys` drops nested `selectKey` elements from the body.
    /// Configuration variables were applied when the unit loaded, so only
    /// properties declared on `include` elements are expanded here.
    fn template(&mut self, node: &Node, skip_keys: bool) -> Result<Resolution<SqlTemplate>, MappingError> {
        let variables = BTreeMap::new();
        let mut expanded = Vec::new();
        ready!(self.expand_children(node, &variables, &mut expanded)?);
        let segments = expanded
            .into_iter()
            .filter(|child| !(skip_keys && child.name == "selectKey"))
            .map(|child| {
                if child.name == TEXT_NODE {
                    SqlSegment::Text(child.text.unwrap_or_default())
                } else {
                    SqlSegment::Dynamic(child)
                }
            })
            .collect();
        Ok(Resolution::Ready(SqlTemplate::from_segments(segments)))
    }

    /// Builds a `selectKey` declaration.
    fn select_key(&mut self, node: &Node) -> Result<Resolution<SelectKey>, MappingError> {
        let sql = ready!(self.template(node, false)?);
        let before = match node.attr("order") {
            Some(order) => match order.trim().to_ascii_uppercase().as_str() {
                "BEFORE" => true,
                "AFTER" => false,
                _ => {
                    return Err(MappingError::Unsupported {
                        element: node.name.clone(),
                        attribute: "order".to_string(),
                        value: order.to_string(),
                    });
                }
            },
            None => false,
        };
        Ok(Resolution::Ready(SelectKey {
            sql,
            result_type: self.config.aliases().resolve_opt(node.attr("resultType")),
            before,
        }))
    }

    /// Appends the expanded body of `node` to `out`, splicing includes.
    fn expand_children(
        &mut self,
        node: &Node,
        variables: &BTreeMap<String, String>,
        out: &mut Vec<Node>,
    ) -> Result<Resolution<()>, MappingError> {
        for segment in node.body_segments() {
            match segment {
                BodySegment::Text(text) => {
                    out.push(Node::text_segment(substitute_placeholders(text, variables)));
                }
                BodySegment::Element(include) if include.name == "include" => {
                    ready!(self.splice(include, variables, out)?);
                }
                BodySegment::Element(element) => {
                    let mut expanded = Node::new(element.name.clone());
                    for (name, value) in &element.attributes {
                        expanded.attributes.insert(name.clone(), substitute_placeholders(value, variables));
                    }
                    ready!(self.expand_children(element, variables, &mut expanded.children)?);
                    out.push(expanded);
                }
            }
        }
        Ok(Resolution::Ready(()))
    }

    /// Replaces an `include` element with the referenced fragment's body.
    fn splice(
        &mut self,
        include: &Node,
        variables: &BTreeMap<String, String>,
        out: &mut Vec<Node>,
    ) -> Result<Resolution<()>, MappingError> {
        let config = self.config;
        let refid = substitute_placeholders(include.require_attr("refid")?, variables);
        let fragment_id = self.namespace.reference(&refid)?;
        if self.chain.contains(&fragment_id) {
            return Err(MappingError::CircularInclude {
                id: fragment_id,
            });
        }
        let Some(fragment) = config.sql_fragment(&fragment_id) else {
            return Ok(Resolution::Pending(Unmet::SqlFragment(fragment_id)));
        };
        let mut scoped = variables.clone();
        for (name, value) in include.children_as_properties()? {
            scoped.insert(name, substitute_placeholders(&value, variables));
        }
        self.chain.push(fragment_id);
        let outcome = self.expand_children(fragment, &scoped, out);
        self.chain.pop();
        outcome
    }
}

#[cfg(test)]
mod tests;
