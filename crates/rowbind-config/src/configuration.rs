// crates/rowbind-config/src/configuration.rs
// ============================================================================
// Module: Rowbind Configuration Model
// Description: Registries, pending queues, and the resolution fixpoint.
// Purpose: Hold every descriptor a build produces and resolve forward references.
// Dependencies: rowbind-core, serde, tracing
// ============================================================================

//! ## Overview
//! [`Configuration`] owns the descriptor registries (result shapes, parameter
//! shapes, statements, SQL fragments, caches) and three pending queues. Each
//! mapping unit is parsed into the registries; items whose references are not
//! registered yet are deferred and replayed after every unit. Once all units
//! are loaded, [`Configuration::resolve_pending`] replays until no item makes
//! progress, fails on leftovers, and validates cross-references.
//!
//! Security posture: mapping units are untrusted input; every reference is
//! checked before the configuration is handed out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use rowbind_core::AliasRegistry;
use rowbind_core::CacheError;
use rowbind_core::CachePolicy;
use rowbind_core::ConverterId;
use rowbind_core::DataSourceSpec;
use rowbind_core::DatabaseId;
use rowbind_core::InterceptorChain;
use rowbind_core::MappedStatement;
use rowbind_core::Namespace;
use rowbind_core::NamespaceCache;
use rowbind_core::Node;
use rowbind_core::ParameterShape;
use rowbind_core::Plugin;
use rowbind_core::QualifiedId;
use rowbind_core::ResultShape;
use rowbind_core::SchemaRegistry;
use rowbind_core::SqlType;
use rowbind_core::StrictMap;
use rowbind_core::StrictMapError;
use rowbind_core::TypeName;
use rowbind_core::UnitId;
use rowbind_core::plugin::Pluggable;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::error::ConfigError;
use crate::error::MappingError;
use crate::mapper;
use crate::pending::PendingQueue;
use crate::pending::Resolution;
use crate::pending::Unmet;
use crate::pending::ready;
use crate::settings::Settings;
use crate::shape;
use crate::shape::ShapeTask;
use crate::statement;
use crate::statement::StatementTask;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Declared transaction manager of an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionManagerSpec {
    /// Transaction manager type.
    pub kind: String,
    /// Transaction manager properties.
    pub properties: BTreeMap<String, String>,
}

/// Selected environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    /// Environment id.
    pub id: String,
    /// Transaction manager declaration.
    pub transaction_manager: TransactionManagerSpec,
    /// Data source declaration.
    pub data_source: DataSourceSpec,
}

/// Registered value converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConverterRegistration {
    /// Converter implementation name.
    pub handler: ConverterId,
    /// Value type the converter handles.
    pub java_type: Option<TypeName>,
    /// Column type the converter handles.
    pub sql_type: Option<SqlType>,
}

// ============================================================================
// SECTION: Pending Items
// ============================================================================

/// Deferred `cache-ref` element.
#[derive(Debug, Clone)]
pub(crate) struct CacheRefTask {
    /// Referencing namespace.
    pub(crate) namespace: Namespace,
    /// Namespace whose cache is shared.
    pub(crate) target: Namespace,
}

/// Shared SQL fragment.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    /// Fragment body.
    pub(crate) node: Node,
    /// Database qualifier the fragment was declared for.
    pub(crate) database_id: Option<DatabaseId>,
}

/// Pending queues, one per deferrable item kind.
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    /// Deferred cache references.
    pub(crate) cache_refs: PendingQueue<CacheRefTask>,
    /// Deferred result shapes.
    pub(crate) shapes: PendingQueue<ShapeTask>,
    /// Deferred statements.
    pub(crate) statements: PendingQueue<StatementTask>,
}

impl Default for Pending {
    fn default() -> Self {
        Self {
            cache_refs: PendingQueue::new("cache-ref"),
            shapes: PendingQueue::new("result map"),
            statements: PendingQueue::new("statement"),
        }
    }
}

impl Pending {
    /// Returns the number of deferred items.
    fn len(&self) -> usize {
        self.cache_refs.len() + self.shapes.len() + self.statements.len()
    }

    /// Returns true when nothing is deferred.
    fn is_empty(&self) -> bool {
        self.cache_refs.is_empty() && self.shapes.is_empty() && self.statements.is_empty()
    }

    /// Describes every deferred item.
    fn describe(&self) -> Vec<String> {
        let mut items = self.cache_refs.describe();
        items.extend(self.shapes.describe());
        items.extend(self.statements.describe());
        items
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Fully built mapping configuration.
///
/// # Invariants
/// - Result-shape and statement ids are unique per collection.
/// - After [`Configuration::resolve_pending`] succeeds, every shape and
///   statement reference names a registered descriptor.
/// - Namespaces bound to the same cache hold clones of one `Arc`.
#[derive(Debug)]
pub struct Configuration {
    /// Engine settings.
    pub(crate) settings: Settings,
    /// Configuration variables for `${...}` substitution.
    pub(crate) variables: BTreeMap<String, String>,
    /// Selected environment.
    pub(crate) environment: Option<Environment>,
    /// Active database id.
    pub(crate) database_id: Option<DatabaseId>,
    /// Type aliases.
    pub(crate) aliases: AliasRegistry,
    /// Declared record types.
    pub(crate) schemas: SchemaRegistry,
    /// Registered converters.
    pub(crate) converters: Vec<ConverterRegistration>,
    /// Registered interceptors.
    pub(crate) interceptors: InterceptorChain,
    /// Result shapes.
    pub(crate) result_shapes: StrictMap<ResultShape>,
    /// Parameter shapes.
    pub(crate) parameter_shapes: StrictMap<ParameterShape>,
    /// Mapped statements.
    pub(crate) statements: StrictMap<MappedStatement>,
    /// Statement ids declared for the active database.
    pub(crate) database_specific: BTreeSet<QualifiedId>,
    /// Shared SQL fragments.
    pub(crate) sql_fragments: BTreeMap<QualifiedId, Fragment>,
    /// Caches created from `cache` declarations, by declaring namespace.
    pub(crate) caches: BTreeMap<Namespace, Arc<NamespaceCache>>,
    /// Cache in use by each namespace (owned or referenced).
    pub(crate) namespace_caches: BTreeMap<Namespace, Arc<NamespaceCache>>,
    /// Namespaces whose cache reference is not bound yet.
    pub(crate) unresolved_cache_refs: BTreeMap<Namespace, Namespace>,
    /// Mapping units already parsed.
    pub(crate) loaded_units: BTreeSet<UnitId>,
    /// Deferred items.
    pub(crate) pending: Pending,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            variables: BTreeMap::new(),
            environment: None,
            database_id: None,
            aliases: AliasRegistry::with_builtins(),
            schemas: SchemaRegistry::new(),
            converters: Vec::new(),
            interceptors: InterceptorChain::new(),
            result_shapes: StrictMap::new("Result Maps collection"),
            parameter_shapes: StrictMap::new("Parameter Maps collection"),
            statements: StrictMap::new("Mapped Statements collection"),
            database_specific: BTreeSet::new(),
            sql_fragments: BTreeMap::new(),
            caches: BTreeMap::new(),
            namespace_caches: BTreeMap::new(),
            unresolved_cache_refs: BTreeMap::new(),
            loaded_units: BTreeSet::new(),
            pending: Pending::default(),
        }
    }
}

impl Configuration {
    /// Creates an empty configuration with built-in aliases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------------

    /// Returns the engine settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns mutable engine settings.
    pub const fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Returns the configuration variables.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Returns the selected environment.
    #[must_use]
    pub const fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Returns the active database id.
    #[must_use]
    pub const fn database_id(&self) -> Option<&DatabaseId> {
        self.database_id.as_ref()
    }

    /// Sets the active database id; must happen before units are parsed.
    pub fn set_database_id(&mut self, database_id: Option<DatabaseId>) {
        self.database_id = database_id;
    }

    /// Returns the alias registry.
    #[must_use]
    pub const fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Returns the mutable alias registry.
    pub const fn aliases_mut(&mut self) -> &mut AliasRegistry {
        &mut self.aliases
    }

    /// Returns the record-type schemas.
    #[must_use]
    pub const fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Returns the mutable record-type schemas.
    pub const fn schemas_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.schemas
    }

    /// Returns registered converters.
    #[must_use]
    pub fn converters(&self) -> &[ConverterRegistration] {
        &self.converters
    }

    /// Returns the interceptor chain.
    #[must_use]
    pub const fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Appends an interceptor to the chain.
    pub fn add_plugin(&mut self, plugin: Plugin) {
        self.interceptors.add(plugin);
    }

    /// Wraps an extension-point object with every registered interceptor.
    #[must_use]
    pub fn plugin<T: Pluggable + ?Sized>(&self, target: Arc<T>) -> Arc<T> {
        self.interceptors.plugin_all(target)
    }

    /// Returns all result shapes.
    #[must_use]
    pub const fn result_shapes(&self) -> &StrictMap<ResultShape> {
        &self.result_shapes
    }

    /// Looks up a result shape by full id or unique short name.
    ///
    /// # Errors
    ///
    /// Returns [`StrictMapError`] when a short name is ambiguous.
    pub fn result_shape(&self, key: &str) -> Result<Option<&ResultShape>, StrictMapError> {
        self.result_shapes.get(key)
    }

    /// Returns all parameter shapes.
    #[must_use]
    pub const fn parameter_shapes(&self) -> &StrictMap<ParameterShape> {
        &self.parameter_shapes
    }

    /// Returns all mapped statements.
    #[must_use]
    pub const fn statements(&self) -> &StrictMap<MappedStatement> {
        &self.statements
    }

    /// Looks up a statement by full id or unique short name.
    ///
    /// # Errors
    ///
    /// Returns [`StrictMapError`] when a short name is ambiguous.
    pub fn statement(&self, key: &str) -> Result<Option<&MappedStatement>, StrictMapError> {
        self.statements.get(key)
    }

    /// Returns the cache a namespace uses, owned or referenced.
    #[must_use]
    pub fn cache(&self, namespace: &str) -> Option<&Arc<NamespaceCache>> {
        let namespace = Namespace::new(namespace).ok()?;
        self.namespace_caches.get(&namespace)
    }

    /// Returns caches by declaring namespace.
    #[must_use]
    pub const fn caches(&self) -> &BTreeMap<Namespace, Arc<NamespaceCache>> {
        &self.caches
    }

    /// Clears the cache a namespace uses. Returns false when it uses none.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache lock is poisoned.
    pub fn clear_cache(&self, namespace: &str) -> Result<bool, CacheError> {
        match self.cache(namespace) {
            Some(cache) => cache.clear().map(|()| true),
            None => Ok(false),
        }
    }

    /// Returns the parsed mapping units.
    #[must_use]
    pub const fn loaded_units(&self) -> &BTreeSet<UnitId> {
        &self.loaded_units
    }

    /// Returns true when `unit` was already parsed.
    #[must_use]
    pub fn is_unit_loaded(&self, unit: &UnitId) -> bool {
        self.loaded_units.contains(unit)
    }

    /// Returns the number of deferred items.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns the cache-ref target of a namespace whose reference is unbound.
    pub(crate) fn unresolved_cache_ref(&self, namespace: &Namespace) -> Option<&Namespace> {
        self.unresolved_cache_refs.get(namespace)
    }

    /// Returns a registered SQL fragment body.
    pub(crate) fn sql_fragment(&self, id: &QualifiedId) -> Option<&Node> {
        self.sql_fragments.get(id).map(|fragment| &fragment.node)
    }

    // ------------------------------------------------------------------------
    // Mapping Units
    // ------------------------------------------------------------------------

    /// Parses one mapping unit, then replays every deferred item once.
    ///
    /// Returns false when `unit` was already loaded and nothing was done.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Mapping`] for invalid unit content.
    pub fn add_mapping_unit(&mut self, unit: UnitId, mut node: Node) -> Result<bool, ConfigError> {
        if self.loaded_units.contains(&unit) {
            debug!(unit = %unit, "mapping unit already loaded");
            return Ok(false);
        }
        self.loaded_units.insert(unit.clone());
        node.substitute_variables(&self.variables);
        mapper::parse_unit(self, &unit, &node).map_err(|err| ConfigError::mapping(&unit, err))?;
        let resolved = self.retry_pending()?;
        debug!(unit = %unit, resolved, pending = self.pending.len(), "mapping unit parsed");
        Ok(true)
    }

    /// Replays deferred items until no item makes progress, then fails on
    /// leftovers and validates cross-references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unresolved`] when items remain deferred and
    /// [`ConfigError::UnresolvedReference`] when a reference names nothing.
    pub fn resolve_pending(&mut self) -> Result<(), ConfigError> {
        let mut pass = 0_usize;
        while !self.pending.is_empty() {
            pass += 1;
            let resolved = self.retry_pending()?;
            debug!(pass, resolved, remaining = self.pending.len(), "resolution pass");
            if resolved == 0 {
                break;
            }
        }
        if !self.pending.is_empty() {
            let items = self.pending.describe();
            for item in &items {
                warn!(item = %item, "unresolved mapping item");
            }
            return Err(ConfigError::Unresolved {
                items,
            });
        }
        self.validate_references()
    }

    /// Replays every queue once: cache references, shapes, then statements.
    pub(crate) fn retry_pending(&mut self) -> Result<usize, ConfigError> {
        let mut resolved = self.replay(|pending| &mut pending.cache_refs, Self::attempt_cache_ref)?;
        resolved += self.replay(|pending| &mut pending.shapes, Self::attempt_shape)?;
        resolved += self.replay(|pending| &mut pending.statements, Self::attempt_statement)?;
        Ok(resolved)
    }

    /// Replays one queue; items deferred during the replay are appended.
    fn replay<T>(
        &mut self,
        select: fn(&mut Pending) -> &mut PendingQueue<T>,
        attempt: fn(&mut Self, &T, &UnitId) -> Result<Resolution<()>, MappingError>,
    ) -> Result<usize, ConfigError> {
        let mut queue = select(&mut self.pending).detach();
        let outcome =
            queue.retry_all(|item, unit| attempt(self, item, unit).map_err(|err| ConfigError::mapping(unit, err)));
        let added = select(&mut self.pending).detach();
        queue.append(added);
        *select(&mut self.pending) = queue;
        outcome
    }

    // ------------------------------------------------------------------------
    // Build Attempts
    // ------------------------------------------------------------------------

    /// Binds a namespace to the cache of its reference target.
    pub(crate) fn attempt_cache_ref(
        &mut self,
        task: &CacheRefTask,
        _unit: &UnitId,
    ) -> Result<Resolution<()>, MappingError> {
        let Some(cache) = self.namespace_caches.get(&task.target).cloned() else {
            return Ok(Resolution::Pending(Unmet::CacheRef(task.target.clone())));
        };
        debug!(namespace = %task.namespace, target = %task.target, "cache reference bound");
        self.namespace_caches.insert(task.namespace.clone(), cache);
        self.unresolved_cache_refs.remove(&task.namespace);
        Ok(Resolution::Ready(()))
    }

    /// Builds and registers a result shape with its nested shapes.
    pub(crate) fn attempt_shape(&mut self, task: &ShapeTask, _unit: &UnitId) -> Result<Resolution<()>, MappingError> {
        let shapes = ready!(shape::build_result_map(self, task)?);
        for shape in shapes {
            self.result_shapes.insert(shape.id.clone(), shape)?;
        }
        Ok(Resolution::Ready(()))
    }

    /// Builds and registers a statement and its inline shape.
    pub(crate) fn attempt_statement(
        &mut self,
        task: &StatementTask,
        unit: &UnitId,
    ) -> Result<Resolution<()>, MappingError> {
        let built = ready!(statement::build_statement(self, unit, task)?);
        let id = built.statement.id.clone();
        if self.statements.get_full(&id).is_some() {
            return Err(MappingError::duplicate_statement(id, built.statement.database_id.as_ref()));
        }
        if let Some(inline) = built.inline_shape {
            self.result_shapes.insert(inline.id.clone(), inline)?;
        }
        self.statements.insert(id, built.statement)?;
        Ok(Resolution::Ready(()))
    }

    /// Registers a cache declared by `namespace`.
    pub(crate) fn register_cache(&mut self, namespace: Namespace, cache: NamespaceCache) -> Result<(), MappingError> {
        if self.caches.contains_key(&namespace) {
            return Err(MappingError::DuplicateCache {
                namespace: namespace.to_string(),
            });
        }
        let cache = Arc::new(cache);
        debug!(namespace = %namespace, eviction = %cache.policy().eviction, "cache declared");
        self.namespace_caches.insert(namespace.clone(), Arc::clone(&cache));
        self.caches.insert(namespace, cache);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Checks that every resolved reference names a registered descriptor.
    fn validate_references(&self) -> Result<(), ConfigError> {
        for (id, shape) in self.result_shapes.iter() {
            if let Some(discriminator) = &shape.discriminator {
                for target in discriminator.cases.values() {
                    self.require_shape(id, target)?;
                }
            }
            for mapping in &shape.mappings {
                if let Some(nested) = mapping.nested_shape() {
                    self.require_shape(id, nested)?;
                }
                if let Some(select) = mapping.nested_select()
                    && self.statements.get_full(select).is_none()
                {
                    return Err(unresolved(id, "statement", select));
                }
            }
        }
        for (id, parameters) in self.parameter_shapes.iter() {
            for target in parameters.mappings.iter().filter_map(|mapping| mapping.result_shape.as_ref()) {
                self.require_shape(id, target)?;
            }
        }
        Ok(())
    }

    /// Fails unless `target` is a registered result shape.
    fn require_shape(&self, owner: &QualifiedId, target: &QualifiedId) -> Result<(), ConfigError> {
        if self.result_shapes.get_full(target).is_some() {
            return Ok(());
        }
        Err(unresolved(owner, "result map", target))
    }

    // ------------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------------

    /// Returns a serializable view of the resolved model.
    #[must_use]
    pub fn snapshot(&self) -> ModelSnapshot<'_> {
        ModelSnapshot {
            settings: &self.settings,
            environment: self.environment.as_ref(),
            database_id: self.database_id.as_ref(),
            aliases: &self.aliases,
            converters: &self.converters,
            interceptors: self
                .interceptors
                .plugins()
                .map(|plugin| plugin.methods().map(|method| method.to_string()).collect())
                .collect(),
            result_shapes: self.result_shapes.values().collect(),
            parameter_shapes: self.parameter_shapes.values().collect(),
            statements: self.statements.values().collect(),
            caches: self.caches.values().map(|cache| (cache.id(), cache.policy())).collect(),
            cache_bindings: self
                .namespace_caches
                .iter()
                .map(|(namespace, cache)| (namespace, cache.id()))
                .collect(),
            loaded_units: &self.loaded_units,
        }
    }
}

/// Builds an unresolved-reference error.
fn unresolved(owner: &QualifiedId, kind: &'static str, reference: &QualifiedId) -> ConfigError {
    ConfigError::UnresolvedReference {
        owner: owner.to_string(),
        kind,
        reference: reference.to_string(),
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Serializable view of a built configuration.
#[derive(Debug, Serialize)]
pub struct ModelSnapshot<'a> {
    /// Engine settings.
    pub settings: &'a Settings,
    /// Selected environment.
    pub environment: Option<&'a Environment>,
    /// Active database id.
    pub database_id: Option<&'a DatabaseId>,
    /// Type aliases.
    pub aliases: &'a AliasRegistry,
    /// Registered converters.
    pub converters: &'a [ConverterRegistration],
    /// Intercepted methods per interceptor, in chain order.
    pub interceptors: Vec<Vec<String>>,
    /// Result shapes.
    pub result_shapes: Vec<&'a ResultShape>,
    /// Parameter shapes.
    pub parameter_shapes: Vec<&'a ParameterShape>,
    /// Mapped statements.
    pub statements: Vec<&'a MappedStatement>,
    /// Declared cache policies by namespace.
    pub caches: BTreeMap<&'a Namespace, &'a CachePolicy>,
    /// Cache in use per namespace.
    pub cache_bindings: BTreeMap<&'a Namespace, &'a Namespace>,
    /// Parsed mapping units.
    pub loaded_units: &'a BTreeSet<UnitId>,
}
