// crates/rowbind-core/src/plugin/signature.rs
// ============================================================================
// Module: Rowbind Interception Signatures
// Description: Static method table of the extension points and declared signatures.
// Purpose: Match declarative interceptor signatures against real methods.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every interceptable method is listed once in [`Method::ALL`] with its
//! extension point, name, and parameter type names. Interceptors describe
//! what they observe with [`Signature`] values; a signature that matches no
//! table entry is a registration error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Interceptor registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// Signature names an unknown extension point.
    #[error("unknown extension point '{point}'")]
    UnknownPoint {
        /// Point as written.
        point: String,
    },
    /// Signature matches no method of its extension point.
    #[error("could not find method on {point} named {method} with arguments ({args})")]
    UnknownMethod {
        /// Extension point.
        point: String,
        /// Method name.
        method: String,
        /// Comma-separated argument types.
        args: String,
    },
    /// Interceptor declared nothing to intercept.
    #[error("interceptor {interceptor} declares no signatures")]
    NoSignatures {
        /// Interceptor name.
        interceptor: String,
    },
    /// Interceptor rejected its properties.
    #[error("interceptor {interceptor} rejected properties: {message}")]
    Properties {
        /// Interceptor name.
        interceptor: String,
        /// Rejection reason.
        message: String,
    },
}

// ============================================================================
// SECTION: Extension Points
// ============================================================================

/// Interceptable extension-point interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtensionPoint {
    /// [`crate::interfaces::Executor`].
    Executor,
    /// [`crate::interfaces::ParameterHandler`].
    ParameterHandler,
    /// [`crate::interfaces::ResultSetHandler`].
    ResultSetHandler,
    /// [`crate::interfaces::StatementHandler`].
    StatementHandler,
}

impl ExtensionPoint {
    /// Parses an interface name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "Executor" => Some(Self::Executor),
            "ParameterHandler" => Some(Self::ParameterHandler),
            "ResultSetHandler" => Some(Self::ResultSetHandler),
            "StatementHandler" => Some(Self::StatementHandler),
            _ => None,
        }
    }

    /// Returns the interface name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Executor => "Executor",
            Self::ParameterHandler => "ParameterHandler",
            Self::ResultSetHandler => "ResultSetHandler",
            Self::StatementHandler => "StatementHandler",
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Method Table
// ============================================================================

/// Static description of one interceptable method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    /// Owning extension point.
    pub point: ExtensionPoint,
    /// Method name.
    pub method: &'static str,
    /// Parameter type names in order.
    pub args: &'static [&'static str],
}

/// `Executor.query` parameter types.
const QUERY_ARGS: &[&str] = &["MappedStatement", "Parameter", "RowBounds"];
/// `Executor.update` parameter types.
const UPDATE_ARGS: &[&str] = &["MappedStatement", "Parameter"];
/// Transaction method parameter types.
const FLAG_ARGS: &[&str] = &["bool"];
/// Parameterless methods.
const NO_ARGS: &[&str] = &[];
/// Methods taking a prepared statement.
const PREPARED_ARGS: &[&str] = &["PreparedSql"];
/// `StatementHandler.prepare` parameter types.
const TIMEOUT_ARGS: &[&str] = &["Timeout"];

/// Builds a table entry.
const fn entry(
    point: ExtensionPoint,
    method: &'static str,
    args: &'static [&'static str],
) -> MethodSignature {
    MethodSignature {
        point,
        method,
        args,
    }
}

/// Interceptable method identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// `Executor.query(MappedStatement, Parameter, RowBounds)`.
    ExecutorQuery,
    /// `Executor.update(MappedStatement, Parameter)`.
    ExecutorUpdate,
    /// `Executor.commit(bool)`.
    ExecutorCommit,
    /// `Executor.rollback(bool)`.
    ExecutorRollback,
    /// `ParameterHandler.parameter_object()`.
    ParameterObject,
    /// `ParameterHandler.bind_parameters(PreparedSql)`.
    BindParameters,
    /// `ResultSetHandler.handle_result_sets(PreparedSql)`.
    HandleResultSets,
    /// `StatementHandler.prepare(Timeout)`.
    StatementPrepare,
    /// `StatementHandler.query(PreparedSql)`.
    StatementQuery,
    /// `StatementHandler.update(PreparedSql)`.
    StatementUpdate,
}

impl Method {
    /// Every interceptable method.
    pub const ALL: [Self; 10] = [
        Self::ExecutorQuery,
        Self::ExecutorUpdate,
        Self::ExecutorCommit,
        Self::ExecutorRollback,
        Self::ParameterObject,
        Self::BindParameters,
        Self::HandleResultSets,
        Self::StatementPrepare,
        Self::StatementQuery,
        Self::StatementUpdate,
    ];

    /// Returns the table entry for this method.
    #[must_use]
    pub const fn signature(self) -> MethodSignature {
        match self {
            Self::ExecutorQuery => entry(ExtensionPoint::Executor, "query", QUERY_ARGS),
            Self::ExecutorUpdate => entry(ExtensionPoint::Executor, "update", UPDATE_ARGS),
            Self::ExecutorCommit => entry(ExtensionPoint::Executor, "commit", FLAG_ARGS),
            Self::ExecutorRollback => entry(ExtensionPoint::Executor, "rollback", FLAG_ARGS),
            Self::ParameterObject => entry(ExtensionPoint::ParameterHandler, "parameter_object", NO_ARGS),
            Self::BindParameters => entry(ExtensionPoint::ParameterHandler, "bind_parameters", PREPARED_ARGS),
            Self::HandleResultSets => {
                entry(ExtensionPoint::ResultSetHandler, "handle_result_sets", PREPARED_ARGS)
            }
            Self::StatementPrepare => entry(ExtensionPoint::StatementHandler, "prepare", TIMEOUT_ARGS),
            Self::StatementQuery => entry(ExtensionPoint::StatementHandler, "query", PREPARED_ARGS),
            Self::StatementUpdate => entry(ExtensionPoint::StatementHandler, "update", PREPARED_ARGS),
        }
    }

    /// Returns the owning extension point.
    #[must_use]
    pub const fn point(self) -> ExtensionPoint {
        self.signature().point
    }

    /// Finds the method matching a point, name, and exact argument list.
    #[must_use]
    pub fn lookup(point: ExtensionPoint, method: &str, args: &[String]) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| {
            let signature = candidate.signature();
            signature.point == point
                && signature.method == method
                && signature.args.len() == args.len()
                && signature.args.iter().zip(args).all(|(expected, actual)| *expected == actual.as_str())
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signature = self.signature();
        write!(f, "{}.{}({})", signature.point, signature.method, signature.args.join(", "))
    }
}

// ============================================================================
// SECTION: Declared Signatures
// ============================================================================

/// Declarative `type + method + argument types` description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Extension point interface name.
    pub point: String,
    /// Method name.
    pub method: String,
    /// Parameter type names.
    pub args: Vec<String>,
}

impl Signature {
    /// Creates a signature.
    #[must_use]
    pub fn new(point: impl Into<String>, method: impl Into<String>, args: &[&str]) -> Self {
        Self {
            point: point.into(),
            method: method.into(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }

    /// Creates a signature from a comma-separated argument list.
    #[must_use]
    pub fn parse(point: &str, method: &str, args: &str) -> Self {
        Self {
            point: point.trim().to_string(),
            method: method.trim().to_string(),
            args: args
                .split(',')
                .map(str::trim)
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Resolves the signature against the method table.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the point or method is unknown.
    pub fn resolve(&self) -> Result<Method, PluginError> {
        let point = ExtensionPoint::parse(&self.point).ok_or_else(|| PluginError::UnknownPoint {
            point: self.point.clone(),
        })?;
        Method::lookup(point, self.method.trim(), &self.args).ok_or_else(|| PluginError::UnknownMethod {
            point: self.point.clone(),
            method: self.method.clone(),
            args: self.args.join(", "),
        })
    }
}
