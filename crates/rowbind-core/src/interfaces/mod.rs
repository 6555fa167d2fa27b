// crates/rowbind-core/src/interfaces/mod.rs
// ============================================================================
// Module: Rowbind Interfaces
// Description: Extension points and collaborator contracts.
// Purpose: Define the surfaces the runtime executes through and the engine reads from.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Two groups of contracts live here:
//! - The four extension points the runtime executes through ([`Executor`],
//!   [`ParameterHandler`], [`ResultSetHandler`], [`StatementHandler`]). The
//!   interception pipeline in [`crate::plugin`] wraps these.
//! - Collaborators the configuration builder reads from: [`MappingSource`]
//!   fetches mapping units and property files, [`DatabaseIdProvider`] names the
//!   active database.
//!
//! Implementations must be `Send + Sync`; wrapped calls run on the caller's
//! thread and may block.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::DatabaseId;
use crate::core::identifiers::TypeName;
use crate::core::identifiers::UnitId;
use crate::core::node::Node;
use crate::core::statement::MappedStatement;
use crate::core::statement::TemplateError;

// ============================================================================
// SECTION: Runtime Values
// ============================================================================

/// One materialized row keyed by column label.
pub type Row = BTreeMap<String, Value>;

/// Limit used when no row limit applies.
pub const NO_ROW_LIMIT: u64 = 2_147_483_647;

/// Offset/limit window applied to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBounds {
    /// Rows skipped.
    pub offset: u64,
    /// Maximum rows returned.
    pub limit: u64,
}

impl RowBounds {
    /// No offset and no limit.
    pub const DEFAULT: Self = Self {
        offset: 0,
        limit: NO_ROW_LIMIT,
    };

    /// Creates a window.
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
        }
    }

    /// Returns true when the window restricts nothing.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.offset == 0 && self.limit == NO_ROW_LIMIT
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Statement prepared for the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedSql {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Bound values in placeholder order.
    pub bindings: Vec<Value>,
    /// Timeout in seconds.
    pub timeout: Option<u32>,
}

impl PreparedSql {
    /// Creates an unbound statement.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
            timeout: None,
        }
    }
}

// ============================================================================
// SECTION: Extension Points
// ============================================================================

/// Errors raised by extension-point implementations and interceptors.
///
/// # Invariants
/// - The interception pipeline propagates these unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// Driver or runtime failure.
    #[error("driver error: {0}")]
    Driver(String),
    /// Interceptor failure.
    #[error("interceptor error: {0}")]
    Interceptor(String),
    /// Static template could not be bound.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Invocation arguments do not belong to the invoked method.
    #[error("arguments do not match method {method}")]
    ArgumentMismatch {
        /// Method identity.
        method: String,
    },
    /// Interceptor returned an outcome of the wrong kind.
    #[error("interceptor returned {actual} for {method}, expected {expected}")]
    OutcomeMismatch {
        /// Method identity.
        method: String,
        /// Expected outcome kind.
        expected: &'static str,
        /// Returned outcome kind.
        actual: &'static str,
    },
}

/// Executes mapped statements.
pub trait Executor: Send + Sync {
    /// Runs a read statement.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when execution fails.
    fn query(
        &self,
        statement: &MappedStatement,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Row>, ExtensionError>;

    /// Runs a write statement, returning affected rows.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when execution fails.
    fn update(&self, statement: &MappedStatement, parameter: &Value) -> Result<u64, ExtensionError>;

    /// Commits pending work.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when the commit fails.
    fn commit(&self, required: bool) -> Result<(), ExtensionError>;

    /// Rolls back pending work.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when the rollback fails.
    fn rollback(&self, required: bool) -> Result<(), ExtensionError>;
}

/// Binds parameter values into a prepared statement.
pub trait ParameterHandler: Send + Sync {
    /// Returns the parameter object being bound.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when the parameter object is unavailable.
    fn parameter_object(&self) -> Result<Value, ExtensionError>;

    /// Writes bound values into `statement`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when a value cannot be bound.
    fn bind_parameters(&self, statement: &mut PreparedSql) -> Result<(), ExtensionError>;
}

/// Materializes driver results into rows.
pub trait ResultSetHandler: Send + Sync {
    /// Reads every result set produced by `statement`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when results cannot be read.
    fn handle_result_sets(&self, statement: &PreparedSql) -> Result<Vec<Row>, ExtensionError>;
}

/// Prepares and runs driver statements.
pub trait StatementHandler: Send + Sync {
    /// Prepares the statement text.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when preparation fails.
    fn prepare(&self, timeout: Option<u32>) -> Result<PreparedSql, ExtensionError>;

    /// Runs a prepared read.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when execution fails.
    fn query(&self, statement: &PreparedSql) -> Result<Vec<Row>, ExtensionError>;

    /// Runs a prepared write.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] when execution fails.
    fn update(&self, statement: &PreparedSql) -> Result<u64, ExtensionError>;
}

// ============================================================================
// SECTION: Mapping Sources
// ============================================================================

/// How a configuration names one mapping unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MapperReference {
    /// Path relative to the source root.
    Resource(String),
    /// Absolute location.
    Url(String),
    /// Unit bound to a mapper type.
    Type(TypeName),
}

impl MapperReference {
    /// Returns the unit identity used by the load guard.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        match self {
            Self::Resource(path) => UnitId::new(path.clone()),
            Self::Url(url) => UnitId::new(url.clone()),
            Self::Type(type_name) => UnitId::new(format!("type:{type_name}")),
        }
    }
}

impl fmt::Display for MapperReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(path) => write!(f, "resource {path}"),
            Self::Url(url) => write!(f, "url {url}"),
            Self::Type(type_name) => write!(f, "type {type_name}"),
        }
    }
}

/// Mapping-source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Reference does not name an existing document.
    #[error("mapping source not found: {reference}")]
    NotFound {
        /// Reference as written.
        reference: String,
    },
    /// Document could not be read.
    #[error("mapping source io error for {reference}: {message}")]
    Io {
        /// Reference as written.
        reference: String,
        /// Underlying error.
        message: String,
    },
    /// Document could not be decoded into a node tree.
    #[error("mapping source parse error for {reference}: {message}")]
    Parse {
        /// Reference as written.
        reference: String,
        /// Underlying error.
        message: String,
    },
    /// Document violates a source limit.
    #[error("mapping source rejected {reference}: {message}")]
    Invalid {
        /// Reference as written.
        reference: String,
        /// Violation.
        message: String,
    },
    /// Source does not support the reference kind.
    #[error("mapping source does not support {reference}")]
    Unsupported {
        /// Reference as written.
        reference: String,
    },
}

/// Fetches mapping units and property files.
pub trait MappingSource {
    /// Loads the node tree for a mapping unit.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the unit cannot be found or decoded.
    fn load(&self, reference: &MapperReference) -> Result<Node, SourceError>;

    /// Lists mapper types declared under a package.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unsupported`] unless overridden.
    fn package(&self, package: &str) -> Result<Vec<MapperReference>, SourceError> {
        Err(SourceError::Unsupported {
            reference: format!("package {package}"),
        })
    }

    /// Loads a key-value property document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Unsupported`] unless overridden.
    fn properties(&self, reference: &MapperReference) -> Result<BTreeMap<String, String>, SourceError> {
        Err(SourceError::Unsupported {
            reference: reference.to_string(),
        })
    }
}

/// Mapping source backed by in-memory node trees.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    /// Units by reference.
    units: BTreeMap<MapperReference, Node>,
    /// Property documents by reference.
    properties: BTreeMap<MapperReference, BTreeMap<String, String>>,
}

impl InMemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit under a resource path.
    #[must_use]
    pub fn with_resource(mut self, path: impl Into<String>, node: Node) -> Self {
        self.units.insert(MapperReference::Resource(path.into()), node);
        self
    }

    /// Adds a unit under an arbitrary reference.
    pub fn insert(&mut self, reference: MapperReference, node: Node) {
        self.units.insert(reference, node);
    }

    /// Adds a property document.
    pub fn insert_properties(&mut self, reference: MapperReference, values: BTreeMap<String, String>) {
        self.properties.insert(reference, values);
    }
}

impl MappingSource for InMemorySource {
    fn load(&self, reference: &MapperReference) -> Result<Node, SourceError> {
        self.units.get(reference).cloned().ok_or_else(|| SourceError::NotFound {
            reference: reference.to_string(),
        })
    }

    fn package(&self, package: &str) -> Result<Vec<MapperReference>, SourceError> {
        let prefix = format!("{package}.");
        Ok(self
            .units
            .keys()
            .filter(|reference| {
                matches!(reference, MapperReference::Type(type_name) if type_name.as_str().starts_with(&prefix))
            })
            .cloned()
            .collect())
    }

    fn properties(&self, reference: &MapperReference) -> Result<BTreeMap<String, String>, SourceError> {
        self.properties.get(reference).cloned().ok_or_else(|| SourceError::NotFound {
            reference: reference.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Database Identification
// ============================================================================

/// Declared data source of the active environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSpec {
    /// Data source factory type.
    pub kind: String,
    /// Data source properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Database identification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseIdError {
    /// Provider failed to inspect the data source.
    #[error("database id provider error: {0}")]
    Provider(String),
}

/// Names the active database so qualified statements can be selected.
pub trait DatabaseIdProvider: Send + Sync {
    /// Receives provider properties from the configuration.
    fn set_properties(&mut self, properties: BTreeMap<String, String>);

    /// Returns the database id for `data_source`, if recognized.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseIdError`] when identification fails.
    fn database_id(&self, data_source: &DataSourceSpec) -> Result<Option<DatabaseId>, DatabaseIdError>;
}
