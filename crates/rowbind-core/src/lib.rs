// crates/rowbind-core/src/lib.rs
// ============================================================================
// Module: Rowbind Core
// Description: Descriptor model, caches, and interception pipeline for Rowbind.
// Purpose: Provide the immutable mapping model and extension-point contracts.
// Dependencies: serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Rowbind maps row-oriented query results to structured records using
//! declarative mapping units. This crate holds everything the configuration
//! builder produces and the runtime consumes:
//! - [`core`]: identifiers, the document node tree, record schemas, result and
//!   parameter shapes, mapped statements, cache policies, aliases.
//! - [`cache`]: thread-safe namespace caches built from cache policies.
//! - [`interfaces`]: the four extension points and collaborator contracts.
//! - [`plugin`]: the declarative interception pipeline.
//!
//! Invariants:
//! - Descriptors are immutable once a configuration finishes building and are
//!   safe to share across threads.
//! - Caches are the only shared mutable state and guard it with one lock per
//!   instance.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod core;
pub mod interfaces;
pub mod plugin;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheError;
pub use cache::NamespaceCache;
pub use self::core::*;
pub use interfaces::DataSourceSpec;
pub use interfaces::DatabaseIdError;
pub use interfaces::DatabaseIdProvider;
pub use interfaces::Executor;
pub use interfaces::ExtensionError;
pub use interfaces::InMemorySource;
pub use interfaces::MapperReference;
pub use interfaces::MappingSource;
pub use interfaces::ParameterHandler;
pub use interfaces::PreparedSql;
pub use interfaces::ResultSetHandler;
pub use interfaces::Row;
pub use interfaces::RowBounds;
pub use interfaces::SourceError;
pub use interfaces::StatementHandler;
pub use plugin::Interceptor;
pub use plugin::InterceptorChain;
pub use plugin::Invocation;
pub use plugin::Outcome;
pub use plugin::Plugin;
pub use plugin::PluginError;
pub use plugin::Signature;
