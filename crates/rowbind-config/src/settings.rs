// crates/rowbind-config/src/settings.rs
// ============================================================================
// Module: Rowbind Engine Settings
// Description: Typed engine settings validated against a fixed key table.
// Purpose: Reject unknown or malformed settings before any unit is parsed.
// Dependencies: rowbind-core, serde
// ============================================================================

//! ## Overview
//! Settings arrive as `setting name=... value=...` pairs. Every key must be
//! one of [`KNOWN_SETTINGS`]; values are parsed into typed fields and a
//! malformed value fails the build. Keys naming pluggable collaborators
//! (`logImpl`, `vfsImpl` and the like) are kept as opaque names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rowbind_core::SqlType;
use serde::Serialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Setting keys accepted in the `settings` element.
pub const KNOWN_SETTINGS: &[&str] = &[
    "cacheEnabled",
    "lazyLoadingEnabled",
    "aggressiveLazyLoading",
    "multipleResultSetsEnabled",
    "useColumnLabel",
    "useGeneratedKeys",
    "autoMappingBehavior",
    "autoMappingUnknownColumnBehavior",
    "defaultExecutorType",
    "defaultStatementTimeout",
    "defaultFetchSize",
    "mapUnderscoreToCamelCase",
    "safeRowBoundsEnabled",
    "safeResultHandlerEnabled",
    "localCacheScope",
    "jdbcTypeForNull",
    "lazyLoadTriggerMethods",
    "callSettersOnNulls",
    "useActualParamName",
    "returnInstanceForEmptyRow",
    "logPrefix",
    "logImpl",
    "vfsImpl",
    "proxyFactory",
    "defaultScriptingLanguage",
    "defaultEnumTypeHandler",
    "configurationFactory",
];

// ============================================================================
// SECTION: Setting Enums
// ============================================================================

/// Which columns are mapped automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoMappingBehavior {
    /// No automatic mapping.
    None,
    /// Automatic mapping for shapes without nested shapes.
    #[default]
    Partial,
    /// Automatic mapping everywhere.
    Full,
}

/// Reaction to columns no mapping claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownColumnBehavior {
    /// Ignore.
    #[default]
    None,
    /// Log a warning.
    Warning,
    /// Fail the mapping.
    Failing,
}

/// Default executor flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutorType {
    /// New statement per call.
    #[default]
    Simple,
    /// Reuse prepared statements.
    Reuse,
    /// Batch writes.
    Batch,
}

/// Lifetime of the session-local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalCacheScope {
    /// Whole session.
    #[default]
    Session,
    /// Single statement.
    Statement,
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Engine settings with their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Namespace caches are honored.
    pub cache_enabled: bool,
    /// Nested selects load lazily unless a mapping says otherwise.
    pub lazy_loading_enabled: bool,
    /// Any access loads every lazy property.
    pub aggressive_lazy_loading: bool,
    /// Statements may return several result sets.
    pub multiple_result_sets_enabled: bool,
    /// Columns are read by label.
    pub use_column_label: bool,
    /// Inserts read driver-generated keys by default.
    pub use_generated_keys: bool,
    /// Automatic column mapping scope.
    pub auto_mapping_behavior: AutoMappingBehavior,
    /// Reaction to unmapped columns.
    pub auto_mapping_unknown_column_behavior: UnknownColumnBehavior,
    /// Default executor flavor.
    pub default_executor_type: ExecutorType,
    /// Statement timeout in seconds.
    pub default_statement_timeout: Option<u32>,
    /// Driver fetch size hint.
    pub default_fetch_size: Option<u32>,
    /// `a_column` maps to `aColumn`.
    pub map_underscore_to_camel_case: bool,
    /// Reject row bounds on nested statements.
    pub safe_row_bounds_enabled: bool,
    /// Reject result handlers on nested statements.
    pub safe_result_handler_enabled: bool,
    /// Session-local cache scope.
    pub local_cache_scope: LocalCacheScope,
    /// Column type used for null parameters.
    pub jdbc_type_for_null: SqlType,
    /// Methods that trigger lazy loading.
    pub lazy_load_trigger_methods: Vec<String>,
    /// Setters run for null values.
    pub call_setters_on_nulls: bool,
    /// Parameters are named after their declared names.
    pub use_actual_param_name: bool,
    /// Empty rows produce empty records instead of nothing.
    pub return_instance_for_empty_row: bool,
    /// Prefix added to log targets.
    pub log_prefix: Option<String>,
    /// Logging implementation name, kept opaque.
    pub log_impl: Option<String>,
    /// Virtual file system implementation name, kept opaque.
    pub vfs_impl: Option<String>,
    /// Lazy-loading proxy factory name, kept opaque.
    pub proxy_factory: Option<String>,
    /// Default scripting language driver name, kept opaque.
    pub default_scripting_language: Option<String>,
    /// Enum converter name, kept opaque.
    pub default_enum_type_handler: Option<String>,
    /// Factory supplying configurations to deserialized lazy loaders, kept opaque.
    pub configuration_factory: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            lazy_loading_enabled: false,
            aggressive_lazy_loading: false,
            multiple_result_sets_enabled: true,
            use_column_label: true,
            use_generated_keys: false,
            auto_mapping_behavior: AutoMappingBehavior::Partial,
            auto_mapping_unknown_column_behavior: UnknownColumnBehavior::None,
            default_executor_type: ExecutorType::Simple,
            default_statement_timeout: None,
            default_fetch_size: None,
            map_underscore_to_camel_case: false,
            safe_row_bounds_enabled: false,
            safe_result_handler_enabled: true,
            local_cache_scope: LocalCacheScope::Session,
            jdbc_type_for_null: SqlType::Other,
            lazy_load_trigger_methods: ["equals", "clone", "hashCode", "toString"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            call_setters_on_nulls: false,
            use_actual_param_name: true,
            return_instance_for_empty_row: false,
            log_prefix: None,
            log_impl: None,
            vfs_impl: None,
            proxy_factory: None,
            default_scripting_language: None,
            default_enum_type_handler: None,
            configuration_factory: None,
        }
    }
}

impl Settings {
    /// Applies one setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSetting`] for keys outside
    /// [`KNOWN_SETTINGS`] and [`ConfigError::InvalidSetting`] for malformed values.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if !KNOWN_SETTINGS.contains(&key) {
            return Err(unknown(key));
        }
        let raw = value.trim();
        match key {
            "cacheEnabled" => self.cache_enabled = parse_bool(key, raw)?,
            "lazyLoadingEnabled" => self.lazy_loading_enabled = parse_bool(key, raw)?,
            "aggressiveLazyLoading" => self.aggressive_lazy_loading = parse_bool(key, raw)?,
            "multipleResultSetsEnabled" => self.multiple_result_sets_enabled = parse_bool(key, raw)?,
            "useColumnLabel" => self.use_column_label = parse_bool(key, raw)?,
            "useGeneratedKeys" => self.use_generated_keys = parse_bool(key, raw)?,
            "autoMappingBehavior" => {
                self.auto_mapping_behavior = match raw.to_ascii_uppercase().as_str() {
                    "NONE" => AutoMappingBehavior::None,
                    "PARTIAL" => AutoMappingBehavior::Partial,
                    "FULL" => AutoMappingBehavior::Full,
                    _ => return Err(invalid(key, raw, "NONE, PARTIAL or FULL")),
                };
            }
            "autoMappingUnknownColumnBehavior" => {
                self.auto_mapping_unknown_column_behavior = match raw.to_ascii_uppercase().as_str() {
                    "NONE" => UnknownColumnBehavior::None,
                    "WARNING" => UnknownColumnBehavior::Warning,
                    "FAILING" => UnknownColumnBehavior::Failing,
                    _ => return Err(invalid(key, raw, "NONE, WARNING or FAILING")),
                };
            }
            "defaultExecutorType" => {
                self.default_executor_type = match raw.to_ascii_uppercase().as_str() {
                    "SIMPLE" => ExecutorType::Simple,
                    "REUSE" => ExecutorType::Reuse,
                    "BATCH" => ExecutorType::Batch,
                    _ => return Err(invalid(key, raw, "SIMPLE, REUSE or BATCH")),
                };
            }
            "defaultStatementTimeout" => self.default_statement_timeout = Some(parse_u32(key, raw)?),
            "defaultFetchSize" => self.default_fetch_size = Some(parse_u32(key, raw)?),
            "mapUnderscoreToCamelCase" => self.map_underscore_to_camel_case = parse_bool(key, raw)?,
            "safeRowBoundsEnabled" => self.safe_row_bounds_enabled = parse_bool(key, raw)?,
            "safeResultHandlerEnabled" => self.safe_result_handler_enabled = parse_bool(key, raw)?,
            "localCacheScope" => {
                self.local_cache_scope = match raw.to_ascii_uppercase().as_str() {
                    "SESSION" => LocalCacheScope::Session,
                    "STATEMENT" => LocalCacheScope::Statement,
                    _ => return Err(invalid(key, raw, "SESSION or STATEMENT")),
                };
            }
            "jdbcTypeForNull" => {
                self.jdbc_type_for_null = SqlType::parse(raw).ok_or_else(|| invalid(key, raw, "a jdbc type name"))?;
            }
            "lazyLoadTriggerMethods" => {
                self.lazy_load_trigger_methods = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|method| !method.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "callSettersOnNulls" => self.call_setters_on_nulls = parse_bool(key, raw)?,
            "useActualParamName" => self.use_actual_param_name = parse_bool(key, raw)?,
            "returnInstanceForEmptyRow" => self.return_instance_for_empty_row = parse_bool(key, raw)?,
            "logPrefix" => self.log_prefix = Some(raw.to_string()),
            "logImpl" => self.log_impl = Some(raw.to_string()),
            "vfsImpl" => self.vfs_impl = Some(raw.to_string()),
            "proxyFactory" => self.proxy_factory = Some(raw.to_string()),
            "defaultScriptingLanguage" => self.default_scripting_language = Some(raw.to_string()),
            "defaultEnumTypeHandler" => self.default_enum_type_handler = Some(raw.to_string()),
            "configurationFactory" => self.configuration_factory = Some(raw.to_string()),
            _ => return Err(unknown(key)),
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an unknown-setting error.
fn unknown(key: &str) -> ConfigError {
    ConfigError::UnknownSetting {
        key: key.to_string(),
    }
}

/// Builds an invalid-setting error.
fn invalid(key: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Parses `true`/`false`, ignoring case.
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "true or false")),
    }
}

/// Parses an unsigned integer.
fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid(key, value, "an unsigned integer"))
}
