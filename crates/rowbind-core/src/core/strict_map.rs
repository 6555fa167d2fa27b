// crates/rowbind-core/src/core/strict_map.rs
// ============================================================================
// Module: Rowbind Strict Id Map
// Description: Descriptor index keyed by qualified id with short-name lookup.
// Purpose: Reject duplicate ids and ambiguous unqualified references.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every inserted value is reachable by its full id and by its short name (the
//! part after the last `.`). When two namespaces declare the same short name,
//! the short name becomes ambiguous: lookups through it fail while full-id
//! lookups keep working.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::QualifiedId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Strict map errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrictMapError {
    /// Full id already present.
    #[error("{collection} already contains value for {id}")]
    Duplicate {
        /// Collection name.
        collection: &'static str,
        /// Duplicate id.
        id: QualifiedId,
    },
    /// Short name maps to several ids.
    #[error("{key} is ambiguous in {collection} (try using the full name including the namespace, or rename one of the entries): {}", join_ids(.candidates))]
    Ambiguous {
        /// Collection name.
        collection: &'static str,
        /// Short name looked up.
        key: String,
        /// Matching full ids.
        candidates: Vec<QualifiedId>,
    },
}

/// Joins ids for error messages.
fn join_ids(ids: &[QualifiedId]) -> String {
    ids.iter().map(QualifiedId::as_str).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Strict Map
// ============================================================================

/// Short-name entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShortName {
    /// Exactly one full id uses this short name.
    Unique(QualifiedId),
    /// Several full ids share this short name.
    Ambiguous(BTreeSet<QualifiedId>),
}

/// Descriptor index with duplicate and ambiguity checks.
#[derive(Debug, Clone)]
pub struct StrictMap<V> {
    /// Collection name used in errors.
    collection: &'static str,
    /// Values keyed by full id.
    entries: BTreeMap<QualifiedId, V>,
    /// Short names to full ids.
    short_names: BTreeMap<String, ShortName>,
}

impl<V> StrictMap<V> {
    /// Creates an empty map named `collection` in errors.
    #[must_use]
    pub const fn new(collection: &'static str) -> Self {
        Self {
            collection,
            entries: BTreeMap::new(),
            short_names: BTreeMap::new(),
        }
    }

    /// Inserts a value under its full id and short name.
    ///
    /// # Errors
    ///
    /// Returns [`StrictMapError::Duplicate`] when `id` is already present.
    pub fn insert(&mut self, id: QualifiedId, value: V) -> Result<(), StrictMapError> {
        if self.entries.contains_key(&id) {
            return Err(StrictMapError::Duplicate {
                collection: self.collection,
                id,
            });
        }
        if id.namespace_part().is_some() {
            let short = id.short_name().to_string();
            let entry = match self.short_names.remove(&short) {
                None => ShortName::Unique(id.clone()),
                Some(ShortName::Unique(existing)) => {
                    ShortName::Ambiguous(BTreeSet::from([existing, id.clone()]))
                }
                Some(ShortName::Ambiguous(mut ids)) => {
                    ids.insert(id.clone());
                    ShortName::Ambiguous(ids)
                }
            };
            self.short_names.insert(short, entry);
        }
        self.entries.insert(id, value);
        Ok(())
    }

    /// Looks up a full id or unambiguous short name.
    ///
    /// # Errors
    ///
    /// Returns [`StrictMapError::Ambiguous`] when a short name is shared.
    pub fn get(&self, key: &str) -> Result<Option<&V>, StrictMapError> {
        if let Some(value) = self.entries.get(&QualifiedId::raw(key)) {
            return Ok(Some(value));
        }
        match self.short_names.get(key) {
            None => Ok(None),
            Some(ShortName::Unique(id)) => Ok(self.entries.get(id)),
            Some(ShortName::Ambiguous(ids)) => Err(StrictMapError::Ambiguous {
                collection: self.collection,
                key: key.to_string(),
                candidates: ids.iter().cloned().collect(),
            }),
        }
    }

    /// Looks up by exact full id.
    #[must_use]
    pub fn get_full(&self, id: &QualifiedId) -> Option<&V> {
        self.entries.get(id)
    }

    /// Returns true when `key` resolves to exactly one value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedId, &V)> {
        self.entries.iter()
    }

    /// Iterates values in id order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for StrictMap<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}
