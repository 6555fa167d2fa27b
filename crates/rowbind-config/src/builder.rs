// crates/rowbind-config/src/builder.rs
// ============================================================================
// Module: Rowbind Configuration Builder
// Description: Single-use builder for the global configuration document.
// Purpose: Apply global declarations in order and load every mapping unit.
// Dependencies: rowbind-core, tracing
// ============================================================================

//! ## Overview
//! [`ConfigBuilder`] reads a `configuration` node in a fixed order:
//! properties, settings, type aliases, plugins, record schemas, environments,
//! database id provider, converters, mappers. Every mapping unit is fetched
//! through a [`MappingSource`] and parsed into the [`Configuration`]; after
//! the last unit the resolver runs to a fixpoint and any leftover is fatal.
//!
//! Interceptors and database id providers are not loaded by name from the
//! document; they are registered on the builder as factories and the
//! document selects them by that name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use rowbind_core::ConverterId;
use rowbind_core::DataSourceSpec;
use rowbind_core::DatabaseId;
use rowbind_core::DatabaseIdProvider;
use rowbind_core::FieldSpec;
use rowbind_core::Interceptor;
use rowbind_core::MapperReference;
use rowbind_core::MappingSource;
use rowbind_core::Node;
use rowbind_core::Plugin;
use rowbind_core::RecordSchema;
use rowbind_core::Signature;
use rowbind_core::TypeName;
use tracing::debug;
use tracing::info;

use crate::configuration::Configuration;
use crate::configuration::ConverterRegistration;
use crate::configuration::Environment;
use crate::configuration::TransactionManagerSpec;
use crate::database_id::VENDOR_ALIAS;
use crate::database_id::VENDOR_PROVIDER;
use crate::database_id::VendorDatabaseIdProvider;
use crate::error::ConfigError;
use crate::shape::sql_type_attr;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Root element of a global configuration document.
const ROOT_ELEMENT: &str = "configuration";

/// Field type assumed when a schema field declares none.
const DEFAULT_FIELD_TYPE: &str = "object";

// ============================================================================
// SECTION: Factories
// ============================================================================

/// Creates a fresh interceptor for each `plugin` declaration.
pub type InterceptorFactory = Box<dyn Fn() -> Box<dyn Interceptor>>;

/// Creates a fresh database id provider.
pub type DatabaseIdProviderFactory = Box<dyn Fn() -> Box<dyn DatabaseIdProvider>>;

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Single-use global configuration builder.
///
/// # Invariants
/// - [`ConfigBuilder::parse`] succeeds at most once per builder.
pub struct ConfigBuilder {
    /// Source of mapping units and property documents.
    source: Box<dyn MappingSource>,
    /// Environment selected by the caller.
    environment: Option<String>,
    /// Database id selected by the caller.
    database_id: Option<DatabaseId>,
    /// Variables that override document properties.
    variables: BTreeMap<String, String>,
    /// Record schemas supplied by the caller.
    schemas: Vec<RecordSchema>,
    /// Interceptor factories by name.
    interceptors: BTreeMap<String, InterceptorFactory>,
    /// Database id provider factories by name.
    database_id_providers: BTreeMap<String, DatabaseIdProviderFactory>,
    /// Whether `parse` was already called.
    parsed: bool,
}

impl ConfigBuilder {
    /// Creates a builder reading mapping units from `source`.
    #[must_use]
    pub fn new(source: impl MappingSource + 'static) -> Self {
        let mut database_id_providers: BTreeMap<String, DatabaseIdProviderFactory> = BTreeMap::new();
        database_id_providers.insert(
            VENDOR_PROVIDER.to_string(),
            Box::new(|| -> Box<dyn DatabaseIdProvider> { Box::new(VendorDatabaseIdProvider::new()) }),
        );
        Self {
            source: Box::new(source),
            environment: None,
            database_id: None,
            variables: BTreeMap::new(),
            schemas: Vec::new(),
            interceptors: BTreeMap::new(),
            database_id_providers,
            parsed: false,
        }
    }

    /// Selects the environment instead of the document default.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Fixes the database id regardless of any declared provider.
    #[must_use]
    pub fn with_database_id(mut self, database_id: DatabaseId) -> Self {
        self.database_id = Some(database_id);
        self
    }

    /// Adds a variable that overrides document properties.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Adds a record schema ahead of document-declared schemas.
    #[must_use]
    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Registers an interceptor factory under `name`.
    #[must_use]
    pub fn register_interceptor(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Interceptor> + 'static,
    ) -> Self {
        self.interceptors.insert(name.into(), Box::new(factory));
        self
    }

    /// Registers a database id provider factory under `name`.
    #[must_use]
    pub fn register_database_id_provider(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn DatabaseIdProvider> + 'static,
    ) -> Self {
        self.database_id_providers.insert(name.into(), Box::new(factory));
        self
    }

    /// Builds a configuration from a `configuration` node.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyParsed`] on a second call, and
    /// [`ConfigError`] for any invalid declaration, unloadable unit, or
    /// reference left unresolved after every unit is loaded.
    pub fn parse(&mut self, root: &Node) -> Result<Configuration, ConfigError> {
        if self.parsed {
            return Err(ConfigError::AlreadyParsed);
        }
        self.parsed = true;
        if root.name != ROOT_ELEMENT {
            return Err(ConfigError::Invalid(format!(
                "expected <{ROOT_ELEMENT}> root element, found <{}>",
                root.name
            )));
        }

        let mut config = Configuration::new();
        config.variables = self.variables(root.child("properties"))?;
        let mut root = root.clone();
        root.substitute_variables(&config.variables);

        if let Some(settings) = root.child("settings") {
            for setting in settings.children_named("setting") {
                config.settings.apply(setting.require_attr("name")?, setting.require_attr("value")?)?;
            }
        }
        if let Some(aliases) = root.child("typeAliases") {
            self.type_aliases(&mut config, aliases)?;
        }
        if let Some(plugins) = root.child("plugins") {
            self.plugins(&mut config, plugins)?;
        }
        for schema in &self.schemas {
            config.schemas.register(schema.clone())?;
        }
        if let Some(schemas) = root.child("schemas") {
            for record in schemas.children_named("record") {
                let schema = record_schema(&config, record)?;
                config.schemas.register(schema)?;
            }
        }
        if let Some(environments) = root.child("environments") {
            config.environment = Some(self.environment(environments)?);
        }
        config.database_id = match root.child("databaseIdProvider") {
            Some(provider) => self.database_id(provider, config.environment.as_ref())?,
            None => self.database_id.clone(),
        };
        if let Some(handlers) = root.child("typeHandlers") {
            self.type_handlers(&mut config, handlers)?;
        }
        if let Some(mappers) = root.child("mappers") {
            self.mappers(&mut config, mappers)?;
        }

        config.resolve_pending()?;
        info!(
            units = config.loaded_units().len(),
            statements = config.statements().len(),
            result_shapes = config.result_shapes().len(),
            caches = config.caches().len(),
            interceptors = config.interceptors().len(),
            database_id = config.database_id().map(DatabaseId::as_str),
            "configuration built"
        );
        Ok(config)
    }

    // ------------------------------------------------------------------------
    // Global Sections
    // ------------------------------------------------------------------------

    /// Collects variables: inline properties, then the referenced property
    /// document, then builder overrides.
    fn variables(&self, node: Option<&Node>) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut variables = BTreeMap::new();
        if let Some(node) = node {
            variables.extend(node.children_as_properties()?);
            let reference = match (node.attr("resource"), node.attr("url")) {
                (Some(_), Some(_)) => return Err(ConfigError::PropertiesReference),
                (Some(resource), None) => Some(MapperReference::Resource(resource.to_string())),
                (None, Some(url)) => Some(MapperReference::Url(url.to_string())),
                (None, None) => None,
            };
            if let Some(reference) = reference {
                variables.extend(self.source.properties(&reference)?);
            }
        }
        variables.extend(self.variables.clone());
        Ok(variables)
    }

    /// Registers `typeAlias` and `package` declarations.
    fn type_aliases(&self, config: &mut Configuration, node: &Node) -> Result<(), ConfigError> {
        for child in node.children() {
            match child.name.as_str() {
                "typeAlias" => {
                    let type_name = TypeName::new(child.require_attr("type")?);
                    match child.attr("alias") {
                        Some(alias) => config.aliases.register(alias, type_name)?,
                        None => config.aliases.register_type(type_name)?,
                    }
                }
                "package" => {
                    for reference in self.source.package(child.require_attr("name")?)? {
                        if let MapperReference::Type(type_name) = reference {
                            config.aliases.register_type(type_name)?;
                        }
                    }
                }
                other => return Err(unexpected(node, other)),
            }
        }
        Ok(())
    }

    /// Instantiates, configures, and registers declared interceptors.
    fn plugins(&self, config: &mut Configuration, node: &Node) -> Result<(), ConfigError> {
        for declaration in node.children_named("plugin") {
            let name = declaration.require_attr("interceptor")?;
            let factory = self.interceptors.get(name).ok_or_else(|| ConfigError::UnknownInterceptor {
                name: name.to_string(),
            })?;
            let mut interceptor = factory();
            interceptor.set_properties(&declaration.children_as_properties()?)?;
            let mut declared = Vec::new();
            for signature in declaration.children_named("signature") {
                declared.push(Signature::parse(
                    signature.require_attr("type")?,
                    signature.require_attr("method")?,
                    signature.attr_or("args", ""),
                ));
            }
            let plugin = Plugin::new(Arc::from(interceptor), &declared)?;
            debug!(interceptor = name, methods = plugin.methods().count(), "interceptor registered");
            config.add_plugin(plugin);
        }
        Ok(())
    }

    /// Selects and reads the active environment.
    fn environment(&self, node: &Node) -> Result<Environment, ConfigError> {
        let selected = self
            .environment
            .as_deref()
            .or_else(|| node.attr("default"))
            .ok_or_else(|| ConfigError::Environment("no environment specified".to_string()))?;
        let declared = node
            .children_named("environment")
            .find(|environment| environment.attr("id") == Some(selected))
            .ok_or_else(|| ConfigError::Environment(format!("environment {selected} is not declared")))?;
        let transaction_manager = declared.child("transactionManager").ok_or_else(|| {
            ConfigError::Environment(format!("environment {selected} declares no transactionManager"))
        })?;
        let data_source = declared
            .child("dataSource")
            .ok_or_else(|| ConfigError::Environment(format!("environment {selected} declares no dataSource")))?;
        debug!(environment = selected, "environment selected");
        Ok(Environment {
            id: selected.to_string(),
            transaction_manager: TransactionManagerSpec {
                kind: transaction_manager.require_attr("type")?.to_string(),
                properties: transaction_manager.children_as_properties()?,
            },
            data_source: DataSourceSpec {
                kind: data_source.require_attr("type")?.to_string(),
                properties: data_source.children_as_properties()?,
            },
        })
    }

    /// Resolves the active database id through the declared provider.
    fn database_id(
        &self,
        node: &Node,
        environment: Option<&Environment>,
    ) -> Result<Option<DatabaseId>, ConfigError> {
        let declared = node.require_attr("type")?;
        let name = if declared == VENDOR_ALIAS { VENDOR_PROVIDER } else { declared };
        let factory = self.database_id_providers.get(name).ok_or_else(|| ConfigError::UnknownDatabaseIdProvider {
            name: declared.to_string(),
        })?;
        let mut provider = factory();
        provider.set_properties(node.children_as_properties()?);
        if let Some(database_id) = &self.database_id {
            return Ok(Some(database_id.clone()));
        }
        match environment {
            Some(environment) => Ok(provider.database_id(&environment.data_source)?),
            None => Ok(None),
        }
    }

    /// Registers converter declarations.
    fn type_handlers(&self, config: &mut Configuration, node: &Node) -> Result<(), ConfigError> {
        for child in node.children() {
            match child.name.as_str() {
                "typeHandler" => {
                    let registration = ConverterRegistration {
                        handler: ConverterId::new(child.require_attr("handler")?),
                        java_type: config.aliases.resolve_opt(child.attr("javaType")),
                        sql_type: sql_type_attr(child)?,
                    };
                    config.converters.push(registration);
                }
                "package" => {
                    for reference in self.source.package(child.require_attr("name")?)? {
                        if let MapperReference::Type(type_name) = reference {
                            config.converters.push(ConverterRegistration {
                                handler: ConverterId::new(type_name.as_str()),
                                java_type: None,
                                sql_type: None,
                            });
                        }
                    }
                }
                other => return Err(unexpected(node, other)),
            }
        }
        Ok(())
    }

    /// Loads every declared mapping unit.
    fn mappers(&self, config: &mut Configuration, node: &Node) -> Result<(), ConfigError> {
        for child in node.children() {
            match child.name.as_str() {
                "package" => {
                    for reference in self.source.package(child.require_attr("name")?)? {
                        self.load_unit(config, &reference)?;
                    }
                }
                "mapper" => {
                    let reference = match (child.attr("resource"), child.attr("url"), child.attr("class")) {
                        (Some(resource), None, None) => MapperReference::Resource(resource.to_string()),
                        (None, Some(url), None) => MapperReference::Url(url.to_string()),
                        (None, None, Some(class)) => MapperReference::Type(
                            config.aliases.resolve(class).unwrap_or_else(|| TypeName::new(class)),
                        ),
                        _ => return Err(ConfigError::MapperReference),
                    };
                    self.load_unit(config, &reference)?;
                }
                other => return Err(unexpected(node, other)),
            }
        }
        Ok(())
    }

    /// Fetches and parses one unit unless it was already loaded.
    fn load_unit(&self, config: &mut Configuration, reference: &MapperReference) -> Result<(), ConfigError> {
        let unit = reference.unit_id();
        if config.is_unit_loaded(&unit) {
            debug!(unit = %unit, "mapping unit already loaded");
            return Ok(());
        }
        let node = self.source.load(reference)?;
        config.add_mapping_unit(unit, node)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a `record` declaration.
fn record_schema(config: &Configuration, node: &Node) -> Result<RecordSchema, ConfigError> {
    let type_name = config
        .aliases
        .resolve(node.require_attr("name")?)
        .ok_or_else(|| ConfigError::Invalid("record name cannot be empty".to_string()))?;
    let mut schema =
        if node.bool_attr("open")?.unwrap_or(false) { RecordSchema::open(type_name) } else { RecordSchema::new(type_name) };
    for child in node.children() {
        match child.name.as_str() {
            "constructor" => {
                for argument in child.children_named("arg") {
                    schema = schema.with_constructor_arg(field_spec(config, argument)?);
                }
            }
            "field" => schema = schema.with_field(field_spec(config, child)?),
            other => return Err(unexpected(node, other)),
        }
    }
    Ok(schema)
}

/// Reads a schema field or constructor argument.
fn field_spec(config: &Configuration, node: &Node) -> Result<FieldSpec, ConfigError> {
    let type_name =
        config.aliases.resolve(node.attr_or("type", DEFAULT_FIELD_TYPE)).unwrap_or_else(|| TypeName::new(DEFAULT_FIELD_TYPE));
    let spec = FieldSpec::new(node.require_attr("name")?, type_name);
    Ok(match config.aliases.resolve_opt(node.attr("ofType")) {
        Some(element_type) => spec.of(element_type),
        None => spec,
    })
}

/// Builds an unexpected-child error.
fn unexpected(parent: &Node, child: &str) -> ConfigError {
    ConfigError::Invalid(format!("unexpected <{child}> inside <{}>", parent.name))
}

#[cfg(test)]
mod tests;
