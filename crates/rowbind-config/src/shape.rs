// crates/rowbind-config/src/shape.rs
// ============================================================================
// Module: Rowbind Shape Builder
// Description: Builds result and parameter shapes from mapping elements.
// Purpose: Turn `resultMap` and `parameterMap` nodes into validated shapes.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! A `resultMap` element becomes one top-level [`ResultShape`] plus one shape
//! per inline nested element (`association`, `collection`, discriminator
//! `case`). Nested shapes are staged and handed back together so a pending
//! parent never leaves half of its children registered.
//!
//! Types are resolved in this order: the element's own type attributes, the
//! nested type policy for inline elements, the `extends` parent's type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rowbind_core::AutoMapping;
use rowbind_core::CompositeColumn;
use rowbind_core::ConverterId;
use rowbind_core::Discriminator;
use rowbind_core::FieldMapping;
use rowbind_core::FieldSource;
use rowbind_core::MappingFlags;
use rowbind_core::Namespace;
use rowbind_core::Node;
use rowbind_core::ParameterMapping;
use rowbind_core::ParameterMode;
use rowbind_core::ParameterShape;
use rowbind_core::QualifiedId;
use rowbind_core::ResultShape;
use rowbind_core::ResultShapeParts;
use rowbind_core::SchemaRegistry;
use rowbind_core::SqlType;
use rowbind_core::TypeName;

use crate::configuration::Configuration;
use crate::error::MappingError;
use crate::pending::Resolution;
use crate::pending::Unmet;
use crate::pending::ready;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Attributes that declare a shape's record type, by precedence.
const TYPE_ATTRIBUTES: &[&str] = &["type", "ofType", "resultType", "javaType"];

/// Elements that may declare an inline nested shape.
const NESTED_ELEMENTS: &[&str] = &["association", "collection", "case"];

/// Type assumed for nested elements whose field type is not declared.
const OPAQUE_TYPE: &str = "object";

// ============================================================================
// SECTION: Tasks
// ============================================================================

/// Deferred `resultMap` element.
#[derive(Debug, Clone)]
pub(crate) struct ShapeTask {
    /// Namespace of the declaring unit.
    pub(crate) namespace: Namespace,
    /// Element as written, variables substituted.
    pub(crate) node: Node,
}

// ============================================================================
// SECTION: Nested Type Policy
// ============================================================================

/// How an inline nested element without a type attribute gets its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NestedTypePolicy {
    /// Type of the same-named field on the enclosing record.
    EnclosingField,
    /// Type of the enclosing shape itself.
    EnclosingType,
}

impl NestedTypePolicy {
    /// Returns the policy that applies to `node`, if any.
    fn for_node(node: &Node) -> Option<Self> {
        match node.name.as_str() {
            "association" | "collection" => Some(Self::EnclosingField),
            "case" => Some(Self::EnclosingType),
            _ => None,
        }
    }

    /// Infers the nested type from the enclosing type.
    fn infer(self, schemas: &SchemaRegistry, node: &Node, enclosing: &TypeName) -> TypeName {
        match self {
            Self::EnclosingType => enclosing.clone(),
            Self::EnclosingField => node
                .attr("property")
                .and_then(|property| schemas.field(enclosing, property))
                .map_or_else(|| TypeName::new(OPAQUE_TYPE), |field| field.target_type().clone()),
        }
    }
}

// ============================================================================
// SECTION: Result Shapes
// ============================================================================

/// Builds a top-level `resultMap` and its inline nested shapes.
///
/// Returned shapes are ordered nested-first; the top-level shape is last.
///
/// # Errors
///
/// Returns [`MappingError`] for invalid content. Missing parents and other
/// unregistered references are reported as [`Resolution::Pending`].
pub(crate) fn build_result_map(
    config: &Configuration,
    task: &ShapeTask,
) -> Result<Resolution<Vec<ResultShape>>, MappingError> {
    let id = task.namespace.declare(task.node.require_attr("id")?)?;
    let mut builder = ShapeBuilder {
        config,
        namespace: &task.namespace,
        staged: Vec::new(),
    };
    ready!(builder.build(&task.node, id, Vec::new(), None)?);
    Ok(Resolution::Ready(builder.staged))
}

/// Recursive shape builder for one top-level element.
struct ShapeBuilder<'a> {
    /// Registries consulted while building.
    config: &'a Configuration,
    /// Namespace references are qualified against.
    namespace: &'a Namespace,
    /// Completed shapes, nested first.
    staged: Vec<ResultShape>,
}

impl ShapeBuilder<'_> {
    /// Builds the shape declared by `node` under `id`.
    fn build(
        &mut self,
        node: &Node,
        id: QualifiedId,
        inherited: Vec<FieldMapping>,
        enclosing: Option<&TypeName>,
    ) -> Result<Resolution<QualifiedId>, MappingError> {
        let config = self.config;
        let extends = node.attr("extends").map(|parent| self.namespace.reference(parent)).transpose()?;
        let parent = match &extends {
            Some(parent_id) => match config.result_shapes().get_full(parent_id) {
                Some(parent) => Some(parent),
                None => return Ok(Resolution::Pending(Unmet::ResultShape(parent_id.clone()))),
            },
            None => None,
        };
        let type_name = resolve_type(config, node, &id, enclosing, parent)?;

        let mut mappings = inherited;
        let mut discriminator = None;
        for child in node.children() {
            match child.name.as_str() {
                "constructor" => {
                    for argument in child.children() {
                        let flags = MappingFlags {
                            identity: argument.name == "idArg",
                            constructor: true,
                        };
                        mappings.push(ready!(self.mapping(argument, &id, &type_name, flags)?));
                    }
                }
                "discriminator" => {
                    discriminator = Some(ready!(self.discriminator(child, &id, &type_name, &mappings)?));
                }
                "id" | "result" | "association" | "collection" => {
                    let flags = MappingFlags {
                        identity: child.name == "id",
                        constructor: false,
                    };
                    mappings.push(ready!(self.mapping(child, &id, &type_name, flags)?));
                }
                other => {
                    return Err(MappingError::Unsupported {
                        element: node.name.clone(),
                        attribute: "child".to_string(),
                        value: other.to_string(),
                    });
                }
            }
        }

        let mappings = match parent {
            Some(parent) => ResultShape::merge_inherited(mappings, parent),
            None => mappings,
        };
        let shape = ResultShape::new(
            ResultShapeParts {
                id: id.clone(),
                type_name,
                mappings,
                discriminator,
                extends,
                auto_mapping: AutoMapping::from(node.bool_attr("autoMapping")?),
            },
            config.schemas(),
        )?;
        self.staged.push(shape);
        Ok(Resolution::Ready(id))
    }

    /// Builds one field mapping, staging an inline nested shape when declared.
    fn mapping(
        &mut self,
        node: &Node,
        owner: &QualifiedId,
        enclosing: &TypeName,
        flags: MappingFlags,
    ) -> Result<Resolution<FieldMapping>, MappingError> {
        let config = self.config;
        let property = if flags.constructor { node.attr("name") } else { node.attr("property") };
        let property = property.map(str::to_string);
        let select = node.attr("select").map(|select| self.namespace.reference(select)).transpose()?;
        let nested = match node.attr("resultMap") {
            Some(reference) => Some(self.namespace.reference(reference)?),
            None if select.is_none() && NESTED_ELEMENTS.contains(&node.name.as_str()) => {
                check_collection_type(config.schemas(), node, enclosing)?;
                let nested_id = owner.with_suffix(&format!("_{}", node.value_based_identifier()));
                Some(ready!(self.build(node, nested_id, Vec::new(), Some(enclosing))?))
            }
            None => None,
        };
        let source = match (select, nested) {
            (Some(_), Some(_)) => {
                return Err(MappingError::ConflictingNested {
                    property: property.unwrap_or_default(),
                });
            }
            (Some(select), None) => FieldSource::NestedSelect(select),
            (None, Some(nested)) => FieldSource::NestedShape(nested),
            (None, None) => FieldSource::Column,
        };
        let (column, composites) = parse_column(node.attr("column"));
        if source == FieldSource::Column && column.is_none() && composites.is_empty() {
            return Err(MappingError::MissingColumn {
                property: property.unwrap_or_default(),
            });
        }
        let lazy = match node.attr("fetchType") {
            Some(fetch) => match fetch.trim().to_ascii_lowercase().as_str() {
                "lazy" => true,
                "eager" => false,
                _ => {
                    return Err(MappingError::Unsupported {
                        element: node.name.clone(),
                        attribute: "fetchType".to_string(),
                        value: fetch.to_string(),
                    });
                }
            },
            None => config.settings().lazy_loading_enabled,
        };
        Ok(Resolution::Ready(FieldMapping {
            property,
            column,
            composites,
            source,
            java_type: config.aliases().resolve_opt(node.attr("javaType")),
            sql_type: sql_type_attr(node)?,
            converter: node.attr("typeHandler").map(ConverterId::new),
            not_null_columns: split_list(node.attr("notNullColumn")),
            column_prefix: node.attr("columnPrefix").map(str::to_string),
            result_set: node.attr("resultSet").map(str::to_string),
            lazy,
            flags,
        }))
    }

    /// Builds a discriminator; inline cases inherit the mappings seen so far.
    fn discriminator(
        &mut self,
        node: &Node,
        owner: &QualifiedId,
        enclosing: &TypeName,
        accumulated: &[FieldMapping],
    ) -> Result<Resolution<Discriminator>, MappingError> {
        let config = self.config;
        let mut cases = BTreeMap::new();
        for case in node.children_named("case") {
            let value = case.require_attr("value")?.to_string();
            let target = match case.attr("resultMap") {
                Some(reference) => self.namespace.reference(reference)?,
                None => {
                    let case_id = owner.with_suffix(&format!("_discriminator_{}", case.value_based_identifier()));
                    ready!(self.build(case, case_id, accumulated.to_vec(), Some(enclosing))?)
                }
            };
            cases.insert(value, target);
        }
        Ok(Resolution::Ready(Discriminator {
            column: node.require_attr("column")?.to_string(),
            java_type: config.aliases().resolve_opt(node.attr("javaType")),
            sql_type: sql_type_attr(node)?,
            converter: node.attr("typeHandler").map(ConverterId::new),
            cases,
        }))
    }
}

/// Determines the record type of a shape element.
fn resolve_type(
    config: &Configuration,
    node: &Node,
    id: &QualifiedId,
    enclosing: Option<&TypeName>,
    parent: Option<&ResultShape>,
) -> Result<TypeName, MappingError> {
    if let Some(declared) = config.aliases().resolve_opt(node.first_attr(TYPE_ATTRIBUTES)) {
        return Ok(declared);
    }
    let inferred = NestedTypePolicy::for_node(node)
        .zip(enclosing)
        .map(|(policy, enclosing)| policy.infer(config.schemas(), node, enclosing));
    inferred.or_else(|| parent.map(|parent| parent.type_name.clone())).ok_or_else(|| MappingError::MissingType {
        id: id.to_string(),
    })
}

/// Rejects multi-valued nested mappings whose element type is unknowable.
fn check_collection_type(schemas: &SchemaRegistry, node: &Node, enclosing: &TypeName) -> Result<(), MappingError> {
    if node.name != "collection" || node.attr("javaType").is_some() {
        return Ok(());
    }
    let property = node.attr("property").unwrap_or_default();
    if schemas.accepts_field(enclosing, property) {
        return Ok(());
    }
    Err(MappingError::AmbiguousCollection {
        property: property.to_string(),
    })
}

// ============================================================================
// SECTION: Parameter Shapes
// ============================================================================

/// Builds a `parameterMap` element.
///
/// # Errors
///
/// Returns [`MappingError`] for missing attributes or unknown modes and types.
pub(crate) fn build_parameter_map(
    config: &Configuration,
    namespace: &Namespace,
    node: &Node,
) -> Result<ParameterShape, MappingError> {
    let id = namespace.declare(node.require_attr("id")?)?;
    let mut mappings = Vec::new();
    for parameter in node.children_named("parameter") {
        let mode = match parameter.attr("mode") {
            Some(raw) => ParameterMode::parse(raw).ok_or_else(|| MappingError::Unsupported {
                element: parameter.name.clone(),
                attribute: "mode".to_string(),
                value: raw.to_string(),
            })?,
            None => ParameterMode::In,
        };
        mappings.push(ParameterMapping {
            property: parameter.require_attr("property")?.to_string(),
            java_type: config.aliases().resolve_opt(parameter.attr("javaType")),
            sql_type: sql_type_attr(parameter)?,
            mode,
            converter: parameter.attr("typeHandler").map(ConverterId::new),
            numeric_scale: parameter.u32_attr("numericScale")?,
            result_shape: parameter.attr("resultMap").map(|reference| namespace.reference(reference)).transpose()?,
        });
    }
    Ok(ParameterShape {
        id,
        type_name: config.aliases().resolve_opt(node.attr("type")),
        mappings,
    })
}

// ============================================================================
// SECTION: Attribute Helpers
// ============================================================================

/// Parses an optional `jdbcType` attribute.
pub(crate) fn sql_type_attr(node: &Node) -> Result<Option<SqlType>, MappingError> {
    node.attr("jdbcType")
        .map(|raw| {
            SqlType::parse(raw).ok_or_else(|| MappingError::UnknownSqlType {
                value: raw.to_string(),
            })
        })
        .transpose()
}

/// Splits a comma-separated attribute into trimmed, non-empty entries.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()).map(str::to_string).collect()
    })
    .unwrap_or_default()
}

/// Splits a `column` attribute into a single column or `{prop=col,...}` composites.
fn parse_column(raw: Option<&str>) -> (Option<String>, Vec<CompositeColumn>) {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return (None, Vec::new());
    };
    if !raw.contains('=') {
        return (Some(raw.to_string()), Vec::new());
    }
    let composites = raw
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .filter_map(|pair| {
            let (property, column) = pair.split_once('=')?;
            Some(CompositeColumn {
                property: property.trim().to_string(),
                column: column.trim().to_string(),
            })
        })
        .collect();
    (None, composites)
}
