// crates/rowbind-core/src/core/aliases.rs
// ============================================================================
// Module: Rowbind Alias Registry
// Description: Case-insensitive short names for record and value types.
// Purpose: Resolve type references written in mapping documents.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Maps short names (`blog`, `int`, `LRU`) to concrete [`TypeName`]s. Keys are
//! compared case-insensitively. Registering an alias twice is allowed only when
//! both registrations name the same type.
//!
//! Names with no registered alias resolve to themselves, so fully written type
//! names need no registration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TypeName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Aliases present in every registry built with [`AliasRegistry::with_builtins`].
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("string", "string"),
    ("byte", "i8"),
    ("long", "i64"),
    ("short", "i16"),
    ("int", "i32"),
    ("integer", "i32"),
    ("double", "f64"),
    ("float", "f32"),
    ("boolean", "bool"),
    ("_byte", "i8"),
    ("_long", "i64"),
    ("_short", "i16"),
    ("_int", "i32"),
    ("_integer", "i32"),
    ("_double", "f64"),
    ("_float", "f32"),
    ("_boolean", "bool"),
    ("date", "date"),
    ("decimal", "decimal"),
    ("bigdecimal", "decimal"),
    ("biginteger", "bigint"),
    ("object", "object"),
    ("map", "map"),
    ("hashmap", "map"),
    ("list", "list"),
    ("arraylist", "list"),
    ("collection", "list"),
    ("iterator", "iterator"),
    ("PERPETUAL", "PERPETUAL"),
    ("LRU", "LRU"),
    ("FIFO", "FIFO"),
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Alias registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    /// Alias name was empty.
    #[error("type alias cannot be empty")]
    Empty,
    /// Alias already maps to a different type.
    #[error("the alias '{alias}' is already mapped to the value '{existing}', cannot map it to '{requested}'")]
    Conflict {
        /// Alias as written.
        alias: String,
        /// Type already registered.
        existing: TypeName,
        /// Type requested by the new registration.
        requested: TypeName,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Case-insensitive alias table.
///
/// # Invariants
/// - Keys are stored lower-cased.
/// - Each key maps to exactly one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasRegistry {
    /// Lower-cased alias to type.
    aliases: BTreeMap<String, TypeName>,
}

impl AliasRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with value-type and cache aliases.
    #[must_use]
    pub fn with_builtins() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(alias, type_name)| (alias.to_lowercase(), TypeName::new(*type_name)))
            .collect();
        Self {
            aliases,
        }
    }

    /// Registers `alias` for `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError::Conflict`] when the alias maps to another type.
    pub fn register(&mut self, alias: &str, type_name: TypeName) -> Result<(), AliasError> {
        let key = alias.trim().to_lowercase();
        if key.is_empty() {
            return Err(AliasError::Empty);
        }
        if let Some(existing) = self.aliases.get(&key) {
            if *existing == type_name {
                return Ok(());
            }
            return Err(AliasError::Conflict {
                alias: alias.to_string(),
                existing: existing.clone(),
                requested: type_name,
            });
        }
        self.aliases.insert(key, type_name);
        Ok(())
    }

    /// Registers `type_name` under its simple name.
    ///
    /// # Errors
    ///
    /// Returns [`AliasError`] when the derived alias conflicts.
    pub fn register_type(&mut self, type_name: TypeName) -> Result<(), AliasError> {
        let alias = type_name.simple_name().to_string();
        self.register(&alias, type_name)
    }

    /// Returns the registered type for `alias`, ignoring case.
    #[must_use]
    pub fn lookup(&self, alias: &str) -> Option<&TypeName> {
        self.aliases.get(&alias.trim().to_lowercase())
    }

    /// Resolves a type reference: a registered alias, or the name itself.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<TypeName> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(self.lookup(name).cloned().unwrap_or_else(|| TypeName::new(name)))
    }

    /// Resolves an optional reference.
    #[must_use]
    pub fn resolve_opt(&self, name: Option<&str>) -> Option<TypeName> {
        name.and_then(|name| self.resolve(name))
    }

    /// Returns true when `alias` is registered.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.lookup(alias).is_some()
    }

    /// Returns the number of registered aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns true when no alias is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
