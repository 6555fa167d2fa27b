// crates/rowbind-config/src/error.rs
// ============================================================================
// Module: Rowbind Configuration Errors
// Description: Fatal mapping and configuration build errors.
// Purpose: Attach mapping-unit identity to every fatal parse failure.
// Dependencies: rowbind-core, thiserror
// ============================================================================

//! ## Overview
//! [`MappingError`] describes why one mapping element is invalid;
//! [`ConfigError`] is what a configuration build returns. Unresolved forward
//! references are not errors at this layer: builders report them as
//! [`crate::pending::Unmet`] and the resolver retries them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rowbind_core::AliasError;
use rowbind_core::CacheError;
use rowbind_core::DatabaseId;
use rowbind_core::DatabaseIdError;
use rowbind_core::IdentifierError;
use rowbind_core::NodeError;
use rowbind_core::PluginError;
use rowbind_core::QualifiedId;
use rowbind_core::SchemaError;
use rowbind_core::SourceError;
use rowbind_core::StrictMapError;
use rowbind_core::UnitId;
use thiserror::Error;

// ============================================================================
// SECTION: Mapping Errors
// ============================================================================

/// Invalid content inside one mapping unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// Malformed node attribute.
    #[error(transparent)]
    Node(#[from] NodeError),
    /// Malformed identifier.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    /// Field or constructor argument missing on a declared record type.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Duplicate or ambiguous descriptor id.
    #[error(transparent)]
    Index(#[from] StrictMapError),
    /// Invalid cache declaration.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Conflicting alias.
    #[error(transparent)]
    Alias(#[from] AliasError),
    /// Mapping unit declares no namespace.
    #[error("mapping unit namespace cannot be empty")]
    EmptyNamespace,
    /// Namespace declares both its own cache and a cache reference.
    #[error("namespace {namespace} declares both cache and cache-ref")]
    CacheAndCacheRef {
        /// Offending namespace.
        namespace: String,
    },
    /// Namespace declares its own cache twice.
    #[error("namespace {namespace} declares more than one cache")]
    DuplicateCache {
        /// Offending namespace.
        namespace: String,
    },
    /// Multi-valued nested mapping whose element type cannot be determined.
    #[error("Ambiguous collection type for property '{property}'. You must specify 'javaType' or 'resultMap'.")]
    AmbiguousCollection {
        /// Target property.
        property: String,
    },
    /// Mapping names both a nested select and a nested shape.
    #[error("cannot define both a nested select and a nested result map on property '{property}'")]
    ConflictingNested {
        /// Target property.
        property: String,
    },
    /// Plain mapping without a column.
    #[error("mapping is missing column attribute for property '{property}'")]
    MissingColumn {
        /// Target property.
        property: String,
    },
    /// Result shape whose record type cannot be determined.
    #[error("result map {id} declares no type")]
    MissingType {
        /// Shape id.
        id: String,
    },
    /// Unknown column type name.
    #[error("unknown jdbc type '{value}'")]
    UnknownSqlType {
        /// Value as written.
        value: String,
    },
    /// Attribute value outside its allowed set.
    #[error("<{element}> attribute '{attribute}' has unsupported value '{value}'")]
    Unsupported {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Value as written.
        value: String,
    },
    /// Statement id registered twice for the same database qualifier.
    #[error("statement {id} already registered for database {database}")]
    DuplicateStatement {
        /// Statement id.
        id: QualifiedId,
        /// Database qualifier or `*`.
        database: String,
    },
    /// Fragment inclusion loops back to itself.
    #[error("circular sql fragment include through {id}")]
    CircularInclude {
        /// Fragment id.
        id: QualifiedId,
    },
}

impl MappingError {
    /// Builds a duplicate-statement error.
    pub(crate) fn duplicate_statement(id: QualifiedId, database: Option<&DatabaseId>) -> Self {
        Self::DuplicateStatement {
            id,
            database: database.map_or_else(|| "*".to_string(), ToString::to_string),
        }
    }
}

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Fatal configuration build errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading a document.
    #[error("config io error: {0}")]
    Io(String),
    /// Document could not be deserialized.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Builder was used a second time.
    #[error("each configuration builder can only be used once")]
    AlreadyParsed,
    /// Setting key outside the known set.
    #[error("the setting {key} is not known; make sure you spelled it correctly (case sensitive)")]
    UnknownSetting {
        /// Key as written.
        key: String,
    },
    /// Setting value of the wrong shape.
    #[error("setting {key} has invalid value '{value}': expected {expected}")]
    InvalidSetting {
        /// Setting key.
        key: String,
        /// Value as written.
        value: String,
        /// Accepted values.
        expected: &'static str,
    },
    /// Fatal error inside one mapping unit.
    #[error("error parsing mapping unit {unit}: {source}")]
    Mapping {
        /// Unit that failed.
        unit: UnitId,
        /// Underlying cause.
        #[source]
        source: MappingError,
    },
    /// Items still deferred after the final resolution pass.
    #[error("unresolved references after loading all mapping units: {}", .items.join("; "))]
    Unresolved {
        /// One description per pending item.
        items: Vec<String>,
    },
    /// Resolved model references an id that does not exist.
    #[error("{owner} references unknown {kind} {reference}")]
    UnresolvedReference {
        /// Descriptor holding the reference.
        owner: String,
        /// Reference kind.
        kind: &'static str,
        /// Missing id.
        reference: String,
    },
    /// Mapper reference names zero or several sources.
    #[error("a mapper element may only specify a url, resource or class, but not more than one")]
    MapperReference,
    /// Properties element names both a resource and a url.
    #[error("the properties element cannot specify both a URL and a resource based property file reference")]
    PropertiesReference,
    /// Interceptor name without a registered factory.
    #[error("no interceptor registered under '{name}'")]
    UnknownInterceptor {
        /// Interceptor name.
        name: String,
    },
    /// Database id provider name without a registered factory.
    #[error("no database id provider registered under '{name}'")]
    UnknownDatabaseIdProvider {
        /// Provider name.
        name: String,
    },
    /// Environment selection or wiring problem.
    #[error("environment error: {0}")]
    Environment(String),
    /// Interceptor registration failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// Mapping source failure.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Database id resolution failure.
    #[error(transparent)]
    DatabaseId(#[from] DatabaseIdError),
    /// Global-configuration content error.
    #[error(transparent)]
    Content(#[from] MappingError),
}

/// Lifts global-configuration content errors into [`ConfigError::Content`].
macro_rules! content_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ConfigError {
                fn from(source: $source) -> Self {
                    Self::Content(MappingError::from(source))
                }
            }
        )*
    };
}

content_error!(NodeError, IdentifierError, SchemaError, AliasError);

impl ConfigError {
    /// Wraps a mapping error with the unit that raised it.
    pub(crate) fn mapping(unit: &UnitId, source: impl Into<MappingError>) -> Self {
        Self::Mapping {
            unit: unit.clone(),
            source: source.into(),
        }
    }
}
