// crates/rowbind-core/src/plugin/invocation.rs
// ============================================================================
// Module: Rowbind Invocations
// Description: Intercepted call arguments, outcomes, and the interceptor contract.
// Purpose: Carry one intercepted call through an interceptor and onward.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! An [`Invocation`] is handed to [`Interceptor::intercept`] for every call
//! matching one of its signatures. The interceptor may inspect or rewrite the
//! [`Arguments`], call [`Invocation::proceed`] to continue down the chain, or
//! return its own [`Outcome`] without proceeding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::statement::MappedStatement;
use crate::interfaces::ExtensionError;
use crate::interfaces::PreparedSql;
use crate::interfaces::Row;
use crate::interfaces::RowBounds;
use crate::plugin::signature::Method;
use crate::plugin::signature::PluginError;
use crate::plugin::signature::Signature;

// ============================================================================
// SECTION: Arguments and Outcomes
// ============================================================================

/// Owned arguments of an intercepted call.
#[derive(Debug, Clone)]
pub enum Arguments {
    /// `Executor.query`.
    Query {
        /// Statement to run.
        statement: MappedStatement,
        /// Parameter object.
        parameter: Value,
        /// Row window.
        bounds: RowBounds,
    },
    /// `Executor.update`.
    Update {
        /// Statement to run.
        statement: MappedStatement,
        /// Parameter object.
        parameter: Value,
    },
    /// `Executor.commit` and `Executor.rollback`.
    Transaction {
        /// Whether the operation is mandatory.
        required: bool,
    },
    /// Parameterless methods.
    Empty,
    /// Methods taking a prepared statement.
    Prepared {
        /// Prepared statement.
        statement: PreparedSql,
    },
    /// `StatementHandler.prepare`.
    Timeout {
        /// Timeout in seconds.
        timeout: Option<u32>,
    },
}

/// Result of an intercepted call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Materialized rows.
    Rows(Vec<Row>),
    /// Affected row count.
    Count(u64),
    /// Completed without a value.
    Done,
    /// Single value.
    Value(Value),
    /// Prepared statement.
    Prepared(PreparedSql),
}

impl Outcome {
    /// Returns the outcome kind name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rows(_) => "rows",
            Self::Count(_) => "count",
            Self::Done => "done",
            Self::Value(_) => "value",
            Self::Prepared(_) => "prepared",
        }
    }

    /// Extracts rows.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::OutcomeMismatch`] for any other outcome.
    pub fn into_rows(self, method: Method) -> Result<Vec<Row>, ExtensionError> {
        match self {
            Self::Rows(rows) => Ok(rows),
            other => Err(other.mismatch(method, "rows")),
        }
    }

    /// Extracts a row count.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::OutcomeMismatch`] for any other outcome.
    pub fn into_count(self, method: Method) -> Result<u64, ExtensionError> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(other.mismatch(method, "count")),
        }
    }

    /// Checks for completion.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::OutcomeMismatch`] for any other outcome.
    pub fn into_done(self, method: Method) -> Result<(), ExtensionError> {
        match self {
            Self::Done => Ok(()),
            other => Err(other.mismatch(method, "done")),
        }
    }

    /// Extracts a value.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::OutcomeMismatch`] for any other outcome.
    pub fn into_value(self, method: Method) -> Result<Value, ExtensionError> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(other.mismatch(method, "value")),
        }
    }

    /// Extracts a prepared statement.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::OutcomeMismatch`] for any other outcome.
    pub fn into_prepared(self, method: Method) -> Result<PreparedSql, ExtensionError> {
        match self {
            Self::Prepared(statement) => Ok(statement),
            other => Err(other.mismatch(method, "prepared")),
        }
    }

    /// Builds a mismatch error.
    fn mismatch(&self, method: Method, expected: &'static str) -> ExtensionError {
        ExtensionError::OutcomeMismatch {
            method: method.to_string(),
            expected,
            actual: self.kind(),
        }
    }
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Next link of the chain: the wrapped target.
pub(crate) trait Dispatch {
    /// Invokes `method` on the wrapped target.
    fn dispatch(&self, method: Method, arguments: Arguments) -> Result<Outcome, ExtensionError>;
}

/// One intercepted call.
pub struct Invocation<'a> {
    /// Invoked method.
    method: Method,
    /// Call arguments, rewritable before proceeding.
    arguments: Arguments,
    /// Wrapped target.
    target: &'a dyn Dispatch,
}

impl<'a> Invocation<'a> {
    /// Creates an invocation bound to `target`.
    pub(crate) fn new(method: Method, arguments: Arguments, target: &'a dyn Dispatch) -> Self {
        Self {
            method,
            arguments,
            target,
        }
    }

    /// Returns the invoked method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Returns the arguments.
    #[must_use]
    pub const fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Returns the arguments for rewriting.
    pub const fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// Invokes the wrapped target with the current arguments.
    ///
    /// # Errors
    ///
    /// Propagates the target's [`ExtensionError`] unchanged.
    pub fn proceed(self) -> Result<Outcome, ExtensionError> {
        self.target.dispatch(self.method, self.arguments)
    }
}

// ============================================================================
// SECTION: Interceptor
// ============================================================================

/// Code observing or rewriting extension-point calls.
pub trait Interceptor: Send + Sync {
    /// Handles one intercepted call.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] raised by the interceptor or by proceeding.
    fn intercept(&self, invocation: Invocation<'_>) -> Result<Outcome, ExtensionError>;

    /// Signatures the interceptor declares for itself.
    fn signatures(&self) -> Vec<Signature> {
        Vec::new()
    }

    /// Applies configured properties before registration.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Properties`] when a property is rejected.
    fn set_properties(&mut self, _properties: &BTreeMap<String, String>) -> Result<(), PluginError> {
        Ok(())
    }
}
