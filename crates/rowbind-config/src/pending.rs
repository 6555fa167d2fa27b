// crates/rowbind-config/src/pending.rs
// ============================================================================
// Module: Rowbind Reference Resolver
// Description: Deferred retry of items waiting on forward references.
// Purpose: Resolve out-of-order references by replaying deferred items.
// Dependencies: rowbind-core, tracing
// ============================================================================

//! ## Overview
//! Builders return [`Resolution::Pending`] when a dependency is not registered
//! yet. The caller parks the item in a [`PendingQueue`] and replays the queue
//! after every mapping unit. An item that stays pending after the last unit
//! has no way left to resolve and fails the build.
//!
//! The queue knows nothing about what it holds; result shapes, cache
//! references, and statements each get their own instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rowbind_core::Namespace;
use rowbind_core::QualifiedId;
use rowbind_core::UnitId;
use tracing::trace;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Dependency an item is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmet {
    /// Result shape not registered yet.
    ResultShape(QualifiedId),
    /// Parameter shape not registered yet.
    ParameterShape(QualifiedId),
    /// Namespace whose cache is not available yet.
    CacheRef(Namespace),
    /// Shared SQL fragment not registered yet.
    SqlFragment(QualifiedId),
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResultShape(id) => write!(f, "result map {id}"),
            Self::ParameterShape(id) => write!(f, "parameter map {id}"),
            Self::CacheRef(namespace) => write!(f, "cache of namespace {namespace}"),
            Self::SqlFragment(id) => write!(f, "sql fragment {id}"),
        }
    }
}

/// Outcome of one build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Built.
    Ready(T),
    /// Waiting for a dependency.
    Pending(Unmet),
}

/// Unwraps a ready value or returns the pending outcome from the enclosing function.
macro_rules! ready {
    ($resolution:expr) => {
        match $resolution {
            $crate::pending::Resolution::Ready(value) => value,
            $crate::pending::Resolution::Pending(unmet) => {
                return Ok($crate::pending::Resolution::Pending(unmet));
            }
        }
    };
}

pub(crate) use ready;

// ============================================================================
// SECTION: Pending Queue
// ============================================================================

/// One deferred item and what it last waited for.
#[derive(Debug, Clone)]
struct Deferred<T> {
    /// Item to replay.
    item: T,
    /// Unit that declared the item.
    unit: UnitId,
    /// Dependency reported by the last attempt.
    unmet: Unmet,
}

/// Insertion-ordered queue of deferred items.
///
/// # Invariants
/// - Items are retried in the order they were deferred.
/// - An item leaves the queue only by resolving successfully.
#[derive(Debug, Clone)]
pub struct PendingQueue<T> {
    /// Item kind used in diagnostics.
    kind: &'static str,
    /// Deferred items.
    items: Vec<Deferred<T>>,
}

impl<T> PendingQueue<T> {
    /// Creates an empty queue for items of `kind`.
    #[must_use]
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    /// Records an item that could not complete.
    pub fn defer(&mut self, item: T, unit: UnitId, unmet: Unmet) {
        trace!(kind = self.kind, unit = %unit, waiting_for = %unmet, "deferred");
        self.items.push(Deferred {
            item,
            unit,
            unmet,
        });
    }

    /// Attempts every deferred item once, in insertion order.
    ///
    /// Items that resolve are removed; items still pending stay queued with
    /// their new unmet dependency. Returns the number resolved.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error raised by `attempt`; the failing item and
    /// every item not yet attempted stay queued.
    pub fn retry_all<E>(
        &mut self,
        mut attempt: impl FnMut(&T, &UnitId) -> Result<Resolution<()>, E>,
    ) -> Result<usize, E> {
        let items = std::mem::take(&mut self.items);
        let mut resolved = 0;
        let mut remaining = items.into_iter();
        while let Some(mut deferred) = remaining.next() {
            match attempt(&deferred.item, &deferred.unit) {
                Ok(Resolution::Ready(())) => resolved += 1,
                Ok(Resolution::Pending(unmet)) => {
                    deferred.unmet = unmet;
                    self.items.push(deferred);
                }
                Err(err) => {
                    self.items.push(deferred);
                    self.items.extend(remaining);
                    return Err(err);
                }
            }
        }
        Ok(resolved)
    }

    /// Moves every item into a new queue of the same kind, leaving this one empty.
    #[must_use]
    pub fn detach(&mut self) -> Self {
        Self {
            kind: self.kind,
            items: std::mem::take(&mut self.items),
        }
    }

    /// Appends items deferred while this queue was detached.
    pub fn append(&mut self, mut other: Self) {
        self.items.append(&mut other.items);
    }

    /// Describes every pending item.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|deferred| format!("{} in {} waiting for {}", self.kind, deferred.unit, deferred.unmet))
            .collect()
    }

    /// Returns the number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests;
