// crates/rowbind-core/src/core/mod.rs
// ============================================================================
// Module: Rowbind Descriptor Model
// Description: Value types shared by the configuration builder and runtime.
// Purpose: Group identifiers, documents, schemas, and immutable descriptors.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The descriptor model: identifiers, the document node tree, record schemas,
//! result and parameter shapes, mapped statements, cache policies, the alias
//! registry, and the strict id map.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod aliases;
pub mod cache_policy;
pub mod identifiers;
pub mod node;
pub mod schema;
pub mod shape;
pub mod sql_type;
pub mod statement;
pub mod strict_map;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aliases::AliasError;
pub use aliases::AliasRegistry;
pub use cache_policy::CachePolicy;
pub use cache_policy::DEFAULT_CAPACITY;
pub use cache_policy::Eviction;
pub use cache_policy::PERPETUAL;
pub use identifiers::ConverterId;
pub use identifiers::DatabaseId;
pub use identifiers::IdentifierError;
pub use identifiers::Namespace;
pub use identifiers::QualifiedId;
pub use identifiers::TypeName;
pub use identifiers::UnitId;
pub use node::BodySegment;
pub use node::Node;
pub use node::NodeError;
pub use node::TEXT_NODE;
pub use node::substitute_placeholders;
pub use schema::FieldSpec;
pub use schema::RecordSchema;
pub use schema::SchemaError;
pub use schema::SchemaRegistry;
pub use shape::AutoMapping;
pub use shape::CompositeColumn;
pub use shape::Discriminator;
pub use shape::FieldMapping;
pub use shape::FieldSource;
pub use shape::MappingFlags;
pub use shape::ParameterMapping;
pub use shape::ParameterMode;
pub use shape::ParameterShape;
pub use shape::ResultShape;
pub use shape::ResultShapeParts;
pub use sql_type::SqlType;
pub use statement::BoundSql;
pub use statement::GeneratedKeys;
pub use statement::MappedStatement;
pub use statement::SelectKey;
pub use statement::SqlSegment;
pub use statement::SqlTemplate;
pub use statement::StatementKind;
pub use statement::StatementType;
pub use statement::TemplateError;
pub use strict_map::StrictMap;
pub use strict_map::StrictMapError;
