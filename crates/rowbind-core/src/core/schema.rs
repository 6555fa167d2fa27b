// crates/rowbind-core/src/core/schema.rs
// ============================================================================
// Module: Rowbind Record Schemas
// Description: Declared constructor parameters and mutable fields per record type.
// Purpose: Let shape validation and type inference run without reflection.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The collaborator that owns record construction declares one
//! [`RecordSchema`] per target type: its constructor parameters (in order) and
//! its settable fields, each with a type name and, for multi-valued fields, an
//! element type. Shapes targeting a type without a registered schema are
//! treated as opaque and are not field-checked. Open schemas (map-like
//! records) accept any field name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TypeName;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema registration and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Schema registered twice for the same type.
    #[error("record schema already registered for type {type_name}")]
    Duplicate {
        /// Record type.
        type_name: TypeName,
    },
    /// Field does not exist on the declared record type.
    #[error("no settable field '{field}' on record type {type_name}")]
    UnknownField {
        /// Record type.
        type_name: TypeName,
        /// Field name.
        field: String,
    },
    /// Constructor argument does not exist on the declared record type.
    #[error("no constructor argument '{argument}' on record type {type_name}")]
    UnknownConstructorArg {
        /// Record type.
        type_name: TypeName,
        /// Argument name.
        argument: String,
    },
}

// ============================================================================
// SECTION: Schema Types
// ============================================================================

/// One declared field or constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub type_name: TypeName,
    /// Element type for multi-valued fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<TypeName>,
}

impl FieldSpec {
    /// Creates a single-valued field.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            element_type: None,
        }
    }

    /// Marks the field as multi-valued with the given element type.
    #[must_use]
    pub fn of(mut self, element_type: impl Into<TypeName>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    /// Returns the type a nested shape for this field targets.
    #[must_use]
    pub fn target_type(&self) -> &TypeName {
        self.element_type.as_ref().unwrap_or(&self.type_name)
    }
}

/// Declared structure of one record type.
///
/// # Invariants
/// - `constructor` order is the construction order.
/// - Field names are unique within `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Record type described.
    pub type_name: TypeName,
    /// Constructor parameters in order.
    #[serde(default)]
    pub constructor: Vec<FieldSpec>,
    /// Settable fields.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Whether any field name is accepted.
    #[serde(default)]
    pub open: bool,
}

impl RecordSchema {
    /// Creates a closed schema with no fields.
    #[must_use]
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            constructor: Vec::new(),
            fields: Vec::new(),
            open: false,
        }
    }

    /// Creates an open (map-like) schema.
    #[must_use]
    pub fn open(type_name: impl Into<TypeName>) -> Self {
        Self {
            open: true,
            ..Self::new(type_name)
        }
    }

    /// Appends a constructor parameter.
    #[must_use]
    pub fn with_constructor_arg(mut self, spec: FieldSpec) -> Self {
        self.constructor.push(spec);
        self
    }

    /// Appends a settable field.
    #[must_use]
    pub fn with_field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Returns the settable field with the given name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns true when `name` can be set on this record.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.open || self.field(name).is_some()
    }

    /// Returns the position of a constructor parameter.
    #[must_use]
    pub fn constructor_position(&self, name: &str) -> Option<usize> {
        self.constructor.iter().position(|arg| arg.name == name)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Schema lookup by record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    /// Schemas keyed by type.
    schemas: BTreeMap<TypeName, RecordSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Duplicate`] when the type already has a schema.
    pub fn register(&mut self, schema: RecordSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.type_name) {
            return Err(SchemaError::Duplicate {
                type_name: schema.type_name,
            });
        }
        self.schemas.insert(schema.type_name.clone(), schema);
        Ok(())
    }

    /// Returns the schema for `type_name`, if declared.
    #[must_use]
    pub fn get(&self, type_name: &TypeName) -> Option<&RecordSchema> {
        self.schemas.get(type_name)
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true when no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Checks that a (possibly dotted) property path starts at an existing field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownField`] when the type is declared and closed
    /// and lacks the first path segment.
    pub fn validate_field(&self, type_name: &TypeName, property: &str) -> Result<(), SchemaError> {
        let Some(schema) = self.get(type_name) else {
            return Ok(());
        };
        let head = property.split('.').next().unwrap_or(property);
        if schema.has_field(head) {
            return Ok(());
        }
        Err(SchemaError::UnknownField {
            type_name: type_name.clone(),
            field: property.to_string(),
        })
    }

    /// Returns true when `property` is settable on `type_name` or the type is undeclared.
    #[must_use]
    pub fn accepts_field(&self, type_name: &TypeName, property: &str) -> bool {
        self.validate_field(type_name, property).is_ok()
    }

    /// Returns the declared field for `property` on `type_name`.
    #[must_use]
    pub fn field(&self, type_name: &TypeName, property: &str) -> Option<&FieldSpec> {
        self.get(type_name).and_then(|schema| schema.field(property))
    }
}
