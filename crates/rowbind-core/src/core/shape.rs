// crates/rowbind-core/src/core/shape.rs
// ============================================================================
// Module: Rowbind Result and Parameter Shapes
// Description: Immutable descriptors mapping row columns to record fields.
// Purpose: Define result shapes, field mappings, discriminators, and parameter shapes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ResultShape`] describes how one row becomes one record: ordered field
//! mappings, an optional [`Discriminator`] choosing a more specific shape per
//! row, and an optional parent shape it extends. Shapes are assembled by the
//! configuration builder and never change after resolution.
//!
//! Constructor-argument mappings are ordinary [`FieldMapping`] entries with
//! the constructor flag set, so inheritance and discriminator cases treat
//! them uniformly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ConverterId;
use crate::core::identifiers::QualifiedId;
use crate::core::identifiers::TypeName;
use crate::core::schema::SchemaError;
use crate::core::schema::SchemaRegistry;
use crate::core::sql_type::SqlType;

// ============================================================================
// SECTION: Field Mappings
// ============================================================================

/// Where a mapped value comes from. Exactly one source applies per mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum FieldSource {
    /// Plain column value.
    Column,
    /// Value loaded by running another statement.
    NestedSelect(QualifiedId),
    /// Value materialized from the same row through another shape.
    NestedShape(QualifiedId),
}

/// Flags attached to a field mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFlags {
    /// Column participates in row identity.
    pub identity: bool,
    /// Mapping feeds a constructor argument instead of a field.
    pub constructor: bool,
}

/// `property=column` pair used to pass several columns to a nested select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeColumn {
    /// Parameter property on the nested statement.
    pub property: String,
    /// Source column in the current row.
    pub column: String,
}

/// One column-to-field (or constructor argument) mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Target field or constructor-argument name.
    pub property: Option<String>,
    /// Source column.
    pub column: Option<String>,
    /// Composite columns for nested selects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composites: Vec<CompositeColumn>,
    /// Value source.
    pub source: FieldSource,
    /// Declared value type.
    pub java_type: Option<TypeName>,
    /// Declared column type.
    pub sql_type: Option<SqlType>,
    /// Explicit value converter.
    pub converter: Option<ConverterId>,
    /// Columns that must be non-null before a nested record is created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_null_columns: Vec<String>,
    /// Prefix applied to nested-shape columns.
    pub column_prefix: Option<String>,
    /// Named result set feeding this mapping.
    pub result_set: Option<String>,
    /// Whether a nested select loads on first access.
    pub lazy: bool,
    /// Identity and constructor flags.
    pub flags: MappingFlags,
}

impl FieldMapping {
    /// Creates a plain column mapping.
    #[must_use]
    pub fn column(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            column: Some(column.into()),
            composites: Vec::new(),
            source: FieldSource::Column,
            java_type: None,
            sql_type: None,
            converter: None,
            not_null_columns: Vec::new(),
            column_prefix: None,
            result_set: None,
            lazy: false,
            flags: MappingFlags::default(),
        }
    }

    /// Returns true when the mapping feeds a constructor argument.
    #[must_use]
    pub const fn is_constructor(&self) -> bool {
        self.flags.constructor
    }

    /// Returns true when the mapping participates in row identity.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.flags.identity
    }

    /// Returns the nested shape id, if any.
    #[must_use]
    pub const fn nested_shape(&self) -> Option<&QualifiedId> {
        match &self.source {
            FieldSource::NestedShape(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the nested select id, if any.
    #[must_use]
    pub const fn nested_select(&self) -> Option<&QualifiedId> {
        match &self.source {
            FieldSource::NestedSelect(id) => Some(id),
            _ => None,
        }
    }

    /// Returns true when both mappings target the same property.
    fn overrides(&self, other: &Self) -> bool {
        self.property.is_some() && self.property == other.property
    }
}

// ============================================================================
// SECTION: Discriminator
// ============================================================================

/// Column-driven selection of a more specific shape per row.
///
/// # Invariants
/// - Every case value maps to a shape id known after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminator {
    /// Column holding the discriminating value.
    pub column: String,
    /// Declared value type.
    pub java_type: Option<TypeName>,
    /// Declared column type.
    pub sql_type: Option<SqlType>,
    /// Explicit converter.
    pub converter: Option<ConverterId>,
    /// Case value to shape id.
    pub cases: BTreeMap<String, QualifiedId>,
}

impl Discriminator {
    /// Returns the shape selected for a discriminator value.
    #[must_use]
    pub fn case(&self, value: &str) -> Option<&QualifiedId> {
        self.cases.get(value)
    }
}

// ============================================================================
// SECTION: Result Shape
// ============================================================================

/// Tri-state auto-mapping override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoMapping {
    /// Unmapped columns are auto-mapped.
    Enabled,
    /// Only declared mappings apply.
    Disabled,
    /// Follow the global setting.
    #[default]
    Inherit,
}

impl From<Option<bool>> for AutoMapping {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Enabled,
            Some(false) => Self::Disabled,
            None => Self::Inherit,
        }
    }
}

/// Inputs for [`ResultShape::new`].
#[derive(Debug, Clone)]
pub struct ResultShapeParts {
    /// Qualified id.
    pub id: QualifiedId,
    /// Target record type.
    pub type_name: TypeName,
    /// Field mappings in document order (inherited mappings included).
    pub mappings: Vec<FieldMapping>,
    /// Optional discriminator.
    pub discriminator: Option<Discriminator>,
    /// Parent shape id.
    pub extends: Option<QualifiedId>,
    /// Auto-mapping override.
    pub auto_mapping: AutoMapping,
}

/// Immutable, validated result-shape descriptor.
///
/// # Invariants
/// - Every non-constructor property exists on the target type when the type
///   has a declared schema.
/// - Constructor mappings appear in the schema's constructor order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultShape {
    /// Qualified id.
    pub id: QualifiedId,
    /// Target record type.
    pub type_name: TypeName,
    /// Field mappings.
    pub mappings: Vec<FieldMapping>,
    /// Optional discriminator.
    pub discriminator: Option<Discriminator>,
    /// Parent shape id.
    pub extends: Option<QualifiedId>,
    /// Auto-mapping override.
    pub auto_mapping: AutoMapping,
}

impl ResultShape {
    /// Validates and assembles a shape.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a property or constructor argument is
    /// unknown on a declared record type.
    pub fn new(parts: ResultShapeParts, schemas: &SchemaRegistry) -> Result<Self, SchemaError> {
        let ResultShapeParts {
            id,
            type_name,
            mut mappings,
            discriminator,
            extends,
            auto_mapping,
        } = parts;
        for mapping in mappings.iter().filter(|mapping| !mapping.is_constructor()) {
            if let Some(property) = &mapping.property {
                schemas.validate_field(&type_name, property)?;
            }
        }
        order_constructor_mappings(&type_name, &mut mappings, schemas)?;
        Ok(Self {
            id,
            type_name,
            mappings,
            discriminator,
            extends,
            auto_mapping,
        })
    }

    /// Creates an unvalidated shape with no mappings (statement inline shapes).
    #[must_use]
    pub fn inline(id: QualifiedId, type_name: TypeName) -> Self {
        Self {
            id,
            type_name,
            mappings: Vec::new(),
            discriminator: None,
            extends: None,
            auto_mapping: AutoMapping::Inherit,
        }
    }

    /// Returns identity mappings, or every mapping when none is flagged.
    #[must_use]
    pub fn identity_mappings(&self) -> Vec<&FieldMapping> {
        let flagged: Vec<&FieldMapping> =
            self.mappings.iter().filter(|mapping| mapping.is_identity()).collect();
        if flagged.is_empty() { self.mappings.iter().collect() } else { flagged }
    }

    /// Returns constructor mappings in construction order.
    pub fn constructor_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter(|mapping| mapping.is_constructor())
    }

    /// Returns field (non-constructor) mappings.
    pub fn property_mappings(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter(|mapping| !mapping.is_constructor())
    }

    /// Returns upper-cased mapped column names, prefixes not applied.
    #[must_use]
    pub fn mapped_columns(&self) -> BTreeSet<String> {
        let mut columns = BTreeSet::new();
        for mapping in &self.mappings {
            if let Some(column) = &mapping.column {
                columns.insert(column.to_ascii_uppercase());
            }
            for composite in &mapping.composites {
                columns.insert(composite.column.to_ascii_uppercase());
            }
        }
        columns
    }

    /// Returns true when any mapping uses a nested shape.
    #[must_use]
    pub fn has_nested_shapes(&self) -> bool {
        self.mappings.iter().any(|mapping| mapping.nested_shape().is_some())
    }

    /// Returns true when any mapping uses a nested select.
    #[must_use]
    pub fn has_nested_selects(&self) -> bool {
        self.mappings.iter().any(|mapping| mapping.nested_select().is_some())
    }

    /// Merges a parent's mappings into this shape's own mappings.
    ///
    /// Parent mappings overridden by a child property are dropped; parent
    /// constructor mappings are dropped when the child declares any. Child
    /// mappings keep precedence and come first.
    #[must_use]
    pub fn merge_inherited(own: Vec<FieldMapping>, parent: &Self) -> Vec<FieldMapping> {
        let own_constructor = own.iter().any(FieldMapping::is_constructor);
        let inherited: Vec<FieldMapping> = parent
            .mappings
            .iter()
            .filter(|candidate| !own.iter().any(|mapping| mapping.overrides(candidate)))
            .filter(|candidate| !(own_constructor && candidate.is_constructor()))
            .cloned()
            .collect();
        let mut merged = own;
        merged.extend(inherited);
        merged
    }
}

/// Reorders constructor mappings in place to match the schema's parameter order.
fn order_constructor_mappings(
    type_name: &TypeName,
    mappings: &mut [FieldMapping],
    schemas: &SchemaRegistry,
) -> Result<(), SchemaError> {
    let Some(schema) = schemas.get(type_name) else {
        return Ok(());
    };
    let slots: Vec<usize> = mappings
        .iter()
        .enumerate()
        .filter(|(_, mapping)| mapping.is_constructor())
        .map(|(index, _)| index)
        .collect();
    if slots.is_empty() || slots.iter().any(|index| mappings[*index].property.is_none()) {
        return Ok(());
    }
    let mut ordered = Vec::with_capacity(slots.len());
    for index in &slots {
        let mapping = &mappings[*index];
        let name = mapping.property.as_deref().unwrap_or_default();
        let position = schema.constructor_position(name).ok_or_else(|| {
            SchemaError::UnknownConstructorArg {
                type_name: type_name.clone(),
                argument: name.to_string(),
            }
        })?;
        ordered.push((position, mapping.clone()));
    }
    ordered.sort_by_key(|(position, _)| *position);
    for (slot, (_, mapping)) in slots.into_iter().zip(ordered) {
        mappings[slot] = mapping;
    }
    Ok(())
}

// ============================================================================
// SECTION: Parameter Shape
// ============================================================================

/// Direction of a statement parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    /// Input only.
    #[default]
    In,
    /// Output only.
    Out,
    /// Input and output.
    InOut,
}

impl ParameterMode {
    /// Parses `IN`, `OUT`, or `INOUT`, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            "INOUT" => Some(Self::InOut),
            _ => None,
        }
    }
}

/// One declared statement parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// Property read from the parameter object.
    pub property: String,
    /// Declared value type.
    pub java_type: Option<TypeName>,
    /// Declared column type.
    pub sql_type: Option<SqlType>,
    /// Parameter direction.
    pub mode: ParameterMode,
    /// Explicit converter.
    pub converter: Option<ConverterId>,
    /// Numeric scale for decimal outputs.
    pub numeric_scale: Option<u32>,
    /// Shape used to read cursor outputs.
    pub result_shape: Option<QualifiedId>,
}

/// Declared parameter layout of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterShape {
    /// Qualified id.
    pub id: QualifiedId,
    /// Parameter object type.
    pub type_name: Option<TypeName>,
    /// Ordered parameter mappings.
    pub mappings: Vec<ParameterMapping>,
}
