// crates/rowbind-core/src/core/identifiers.rs
// ============================================================================
// Module: Rowbind Identifiers
// Description: Opaque identifiers for namespaces, descriptors, and record types.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers used across the descriptor model. Statement, result-shape,
//! parameter-shape, and fragment ids are namespace-qualified
//! (`namespace.local`). Qualification follows one rule set for every
//! descriptor kind so that references written in one mapping unit resolve to
//! declarations written in another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Namespace was empty or whitespace.
    #[error("namespace cannot be empty")]
    EmptyNamespace,
    /// Identifier was empty or whitespace.
    #[error("identifier cannot be empty")]
    EmptyId,
    /// Declared id is qualified with a different namespace.
    #[error("dots are not allowed in element names, please remove it from {id}")]
    ForeignQualifier {
        /// Offending identifier.
        id: String,
    },
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Namespace owning a mapping unit's declarations.
///
/// # Invariants
/// - Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Creates a namespace, rejecting empty values.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyNamespace`] when `value` is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdentifierError::EmptyNamespace);
        }
        Ok(Self(value))
    }

    /// Returns the namespace as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualifies a declared id with this namespace.
    ///
    /// Ids already carrying this namespace are kept; ids qualified with any
    /// other namespace are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when `local` is empty or foreign-qualified.
    pub fn declare(&self, local: &str) -> Result<QualifiedId, IdentifierError> {
        let local = local.trim();
        if local.is_empty() {
            return Err(IdentifierError::EmptyId);
        }
        if local.strip_prefix(self.0.as_str()).is_some_and(|rest| rest.starts_with('.')) {
            return Ok(QualifiedId(local.to_string()));
        }
        if local.contains('.') {
            return Err(IdentifierError::ForeignQualifier {
                id: local.to_string(),
            });
        }
        Ok(QualifiedId(format!("{}.{local}", self.0)))
    }

    /// Qualifies a reference to an id that may live in another namespace.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::EmptyId`] when `reference` is empty.
    pub fn reference(&self, reference: &str) -> Result<QualifiedId, IdentifierError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(IdentifierError::EmptyId);
        }
        if reference.contains('.') {
            return Ok(QualifiedId(reference.to_string()));
        }
        Ok(QualifiedId(format!("{}.{reference}", self.0)))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Namespace-qualified descriptor identifier.
///
/// # Invariants
/// - Contains at least one `.` separating namespace and local part, unless
///   constructed through [`QualifiedId::raw`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedId(String);

impl QualifiedId {
    /// Wraps an already-qualified identifier without validation.
    #[must_use]
    pub fn raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the local part after the last `.`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.0.as_str(), |(_, short)| short)
    }

    /// Returns the namespace part before the last `.`, if any.
    #[must_use]
    pub fn namespace_part(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(namespace, _)| namespace)
    }

    /// Derives a child identifier by appending `suffix`.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(format!("{}{suffix}", self.0))
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Target database qualifier attached to statements and fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseId(String);

impl DatabaseId {
    /// Creates a database identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Concrete record or value type name (`domain.blog.Blog`, `string`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Creates a type name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the type name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the simple name after the last `.` or `::`.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let tail = self.0.rsplit_once("::").map_or(self.0.as_str(), |(_, tail)| tail);
        tail.rsplit_once('.').map_or(tail, |(_, tail)| tail)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Logical source name of a mapping unit (`mappers/BlogMapper.toml`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Creates a mapping-unit identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Name of a registered value converter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConverterId(String);

impl ConverterId {
    /// Creates a converter identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
