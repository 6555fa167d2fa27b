// crates/rowbind-core/src/core/statement.rs
// ============================================================================
// Module: Rowbind Mapped Statements
// Description: Statement descriptors and their parameterized SQL templates.
// Purpose: Describe what the runtime executes for a statement id.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`MappedStatement`] pairs an [`SqlTemplate`] with the result and
//! parameter shapes it uses, its cache handle, and execution options. Static
//! templates bind directly into [`BoundSql`]; templates that still contain
//! dynamic elements are rendered by the templating collaborator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cache::NamespaceCache;
use crate::core::identifiers::DatabaseId;
use crate::core::identifiers::QualifiedId;
use crate::core::identifiers::TypeName;
use crate::core::identifiers::UnitId;
use crate::core::node::Node;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Static template binding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template contains elements that need the dynamic renderer.
    #[error("template contains dynamic element <{element}>")]
    Dynamic {
        /// First dynamic element name.
        element: String,
    },
    /// A `${...}` or `#{...}` token was not closed.
    #[error("unterminated placeholder in sql: {fragment}")]
    Unterminated {
        /// Text following the open token.
        fragment: String,
    },
    /// `${name}` referenced a value missing from the parameter object.
    #[error("parameter '{name}' not found for text substitution")]
    MissingParameter {
        /// Parameter property.
        name: String,
    },
}

// ============================================================================
// SECTION: Statement Kinds
// ============================================================================

/// Statement command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Read.
    Select,
    /// Create.
    Insert,
    /// Update.
    Update,
    /// Delete.
    Delete,
}

impl StatementKind {
    /// Maps a statement element name to its kind.
    #[must_use]
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "select" => Some(Self::Select),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns true for reads.
    #[must_use]
    pub const fn is_select(self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Driver statement flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    /// Plain statement.
    Statement,
    /// Prepared statement.
    #[default]
    Prepared,
    /// Stored procedure call.
    Callable,
}

impl StatementType {
    /// Parses `STATEMENT`, `PREPARED`, or `CALLABLE`, ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "STATEMENT" => Some(Self::Statement),
            "PREPARED" => Some(Self::Prepared),
            "CALLABLE" => Some(Self::Callable),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: SQL Templates
// ============================================================================

/// One segment of a statement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SqlSegment {
    /// Literal SQL text.
    Text(String),
    /// Element rendered by the dynamic templating collaborator.
    Dynamic(Node),
}

/// Statement body after fragment inclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlTemplate {
    /// Ordered segments.
    pub segments: Vec<SqlSegment>,
}

/// SQL text ready for the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundSql {
    /// SQL with `?` placeholders.
    pub sql: String,
    /// Parameter properties in placeholder order.
    pub parameters: Vec<String>,
    /// Parameter object the properties are read from.
    pub parameter_object: Value,
}

impl SqlTemplate {
    /// Creates a template from segments, merging adjacent text.
    #[must_use]
    pub fn from_segments(segments: Vec<SqlSegment>) -> Self {
        let mut merged: Vec<SqlSegment> = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                SqlSegment::Text(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(SqlSegment::Text(previous)) = merged.last_mut() {
                        previous.push(' ');
                        previous.push_str(trimmed);
                    } else {
                        merged.push(SqlSegment::Text(trimmed.to_string()));
                    }
                }
                dynamic @ SqlSegment::Dynamic(_) => merged.push(dynamic),
            }
        }
        Self {
            segments: merged,
        }
    }

    /// Creates a static template.
    #[must_use]
    pub fn text(sql: impl Into<String>) -> Self {
        Self::from_segments(vec![SqlSegment::Text(sql.into())])
    }

    /// Returns true when any segment needs the dynamic renderer.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.segments.iter().any(|segment| matches!(segment, SqlSegment::Dynamic(_)))
    }

    /// Binds a static template against a parameter object.
    ///
    /// `#{prop}` becomes `?` and records `prop`; `${prop}` is replaced by the
    /// parameter's value inline.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for dynamic templates, unterminated tokens, or
    /// missing `${...}` values.
    pub fn bind(&self, parameter: &Value) -> Result<BoundSql, TemplateError> {
        let mut raw = String::new();
        for segment in &self.segments {
            match segment {
                SqlSegment::Text(text) => {
                    if !raw.is_empty() {
                        raw.push(' ');
                    }
                    raw.push_str(text);
                }
                SqlSegment::Dynamic(node) => {
                    return Err(TemplateError::Dynamic {
                        element: node.name.clone(),
                    });
                }
            }
        }
        let inlined = replace_tokens(&raw, "${", |name| {
            parameter_text(parameter, name).ok_or_else(|| TemplateError::MissingParameter {
                name: name.to_string(),
            })
        })?;
        let mut parameters = Vec::new();
        let sql = replace_tokens(&inlined, "#{", |expression| {
            let property = expression.split(',').next().unwrap_or(expression).trim();
            parameters.push(property.to_string());
            Ok("?".to_string())
        })?;
        Ok(BoundSql {
            sql,
            parameters,
            parameter_object: parameter.clone(),
        })
    }
}

/// Replaces every `open ... }` token using `replace`.
fn replace_tokens(
    input: &str,
    open: &str,
    mut replace: impl FnMut(&str) -> Result<String, TemplateError>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find(open) {
        out.push_str(&rest[.. start]);
        let after = &rest[start + open.len() ..];
        let end = after.find('}').ok_or_else(|| TemplateError::Unterminated {
            fragment: rest[start ..].to_string(),
        })?;
        out.push_str(&replace(after[.. end].trim())?);
        rest = &after[end + 1 ..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Renders a (dotted) property of the parameter object as SQL text.
fn parameter_text(parameter: &Value, path: &str) -> Option<String> {
    let value = match parameter {
        Value::Object(_) => path.split('.').try_fold(parameter, |current, segment| current.get(segment))?,
        Value::Null => return None,
        scalar => scalar,
    };
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

// ============================================================================
// SECTION: Generated Keys
// ============================================================================

/// Key generation statement run around an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectKey {
    /// Key statement body.
    pub sql: SqlTemplate,
    /// Result type of the key statement.
    pub result_type: Option<TypeName>,
    /// Whether the key runs before the insert.
    pub before: bool,
}

/// Generated-key configuration of a write statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedKeys {
    /// Read driver-generated keys after the write.
    pub use_generated_keys: bool,
    /// Properties receiving generated keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_properties: Vec<String>,
    /// Columns holding generated keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_columns: Vec<String>,
    /// Explicit key statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_key: Option<SelectKey>,
}

// ============================================================================
// SECTION: Mapped Statement
// ============================================================================

/// Immutable statement descriptor.
///
/// # Invariants
/// - Unique per `(id, database_id)` within a configuration.
/// - Every id in `result_shapes` and `parameter_shape` is registered.
#[derive(Clone, Serialize)]
pub struct MappedStatement {
    /// Qualified id.
    pub id: QualifiedId,
    /// Mapping unit that declared the statement.
    pub unit: UnitId,
    /// Command kind.
    pub kind: StatementKind,
    /// Driver statement flavor.
    pub statement_type: StatementType,
    /// Statement body.
    pub sql: SqlTemplate,
    /// Result shapes, one per result set.
    pub result_shapes: Vec<QualifiedId>,
    /// Declared parameter shape.
    pub parameter_shape: Option<QualifiedId>,
    /// Declared parameter object type.
    pub parameter_type: Option<TypeName>,
    /// Target database qualifier.
    pub database_id: Option<DatabaseId>,
    /// Driver fetch size hint.
    pub fetch_size: Option<u32>,
    /// Timeout in seconds.
    pub timeout: Option<u32>,
    /// Clear caches before running.
    pub flush_cache: bool,
    /// Results may be cached.
    pub use_cache: bool,
    /// Nested results arrive ordered by parent id.
    pub result_ordered: bool,
    /// Named result sets for multi-result procedures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub result_sets: Vec<String>,
    /// Generated-key settings.
    pub keys: GeneratedKeys,
    /// Namespace cache shared with other statements of the namespace.
    #[serde(skip)]
    pub cache: Option<Arc<NamespaceCache>>,
}

impl MappedStatement {
    /// Returns the namespace owning the cache in use, if any.
    #[must_use]
    pub fn cache_id(&self) -> Option<&str> {
        self.cache.as_deref().map(|cache| cache.id().as_str())
    }
}

impl fmt::Debug for MappedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedStatement")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("database_id", &self.database_id)
            .field("result_shapes", &self.result_shapes)
            .field("parameter_shape", &self.parameter_shape)
            .field("cache", &self.cache_id())
            .finish_non_exhaustive()
    }
}
