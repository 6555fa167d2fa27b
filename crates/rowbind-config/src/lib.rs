// crates/rowbind-config/src/lib.rs
// ============================================================================
// Module: Rowbind Config
// Description: Configuration builder and mapping-unit resolution for Rowbind.
// Purpose: Turn a configuration document and its mapping units into a model.
// Dependencies: rowbind-core, serde, serde_json, thiserror, toml, tracing
// ============================================================================

//! ## Overview
//! Builds a [`Configuration`] from a global configuration node and the
//! mapping units it references:
//! - [`builder`]: ordered global sections and unit loading.
//! - [`configuration`]: registries and the resolution fixpoint.
//! - [`pending`]: deferred retry of items waiting on forward references.
//! - [`settings`]: typed, validated engine settings.
//! - [`cache_builder`]: cache declarations to namespace caches.
//! - [`database_id`]: the vendor database id provider.
//! - [`load`]: file-backed documents and mapping source.
//!
//! Security posture: configuration documents and mapping units are untrusted;
//! every reference is validated before a configuration is returned.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod builder;
pub mod cache_builder;
pub mod configuration;
pub mod database_id;
pub mod error;
pub mod load;
mod mapper;
pub mod pending;
pub mod settings;
mod shape;
mod statement;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builder::ConfigBuilder;
pub use builder::DatabaseIdProviderFactory;
pub use builder::InterceptorFactory;
pub use configuration::Configuration;
pub use configuration::ConverterRegistration;
pub use configuration::Environment;
pub use configuration::ModelSnapshot;
pub use configuration::TransactionManagerSpec;
pub use database_id::VendorDatabaseIdProvider;
pub use error::ConfigError;
pub use error::MappingError;
pub use load::FileSystemSource;
pub use load::read_node;
pub use load::resolve_config_path;
pub use settings::Settings;
