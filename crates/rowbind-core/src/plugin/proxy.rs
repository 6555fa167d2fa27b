// crates/rowbind-core/src/plugin/proxy.rs
// ============================================================================
// Module: Rowbind Plugin Proxies
// Description: Call-forwarding wrappers for the four extension points.
// Purpose: Route matching calls through an interceptor and pass others through.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! [`Plugin::wrap`] returns a proxy implementing the same extension-point
//! trait as its target. Calls whose method the plugin declared are routed
//! through the interceptor; every other call goes straight to the target.
//! When the plugin declares nothing for the target's extension point, the
//! target itself is returned.
//!
//! [`InterceptorChain::plugin_all`] wraps in registration order, so the last
//! registered interceptor sees a call first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::core::statement::MappedStatement;
use crate::interfaces::Executor;
use crate::interfaces::ExtensionError;
use crate::interfaces::ParameterHandler;
use crate::interfaces::PreparedSql;
use crate::interfaces::ResultSetHandler;
use crate::interfaces::Row;
use crate::interfaces::RowBounds;
use crate::interfaces::StatementHandler;
use crate::plugin::invocation::Arguments;
use crate::plugin::invocation::Dispatch;
use crate::plugin::invocation::Interceptor;
use crate::plugin::invocation::Invocation;
use crate::plugin::invocation::Outcome;
use crate::plugin::signature::ExtensionPoint;
use crate::plugin::signature::Method;
use crate::plugin::signature::PluginError;
use crate::plugin::signature::Signature;

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// Interceptor bound to the methods it declared.
///
/// # Invariants
/// - `methods` is non-empty and every entry exists in [`Method::ALL`].
pub struct Plugin {
    /// Interceptor invoked for matching calls.
    interceptor: Arc<dyn Interceptor>,
    /// Declared methods.
    methods: BTreeSet<Method>,
}

impl Plugin {
    /// Resolves `signatures` plus the interceptor's own declarations.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when a signature matches no method or nothing
    /// is declared at all.
    pub fn new(interceptor: Arc<dyn Interceptor>, signatures: &[Signature]) -> Result<Self, PluginError> {
        let mut methods = BTreeSet::new();
        for signature in interceptor.signatures().iter().chain(signatures) {
            methods.insert(signature.resolve()?);
        }
        if methods.is_empty() {
            return Err(PluginError::NoSignatures {
                interceptor: "interceptor".to_string(),
            });
        }
        Ok(Self {
            interceptor,
            methods,
        })
    }

    /// Returns true when the plugin intercepts `method`.
    #[must_use]
    pub fn intercepts(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Returns true when any declared method belongs to `point`.
    #[must_use]
    pub fn targets(&self, point: ExtensionPoint) -> bool {
        self.methods.iter().any(|method| method.point() == point)
    }

    /// Returns the declared methods.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.methods.iter().copied()
    }

    /// Wraps `target`, or returns it unchanged when nothing targets its point.
    #[must_use]
    pub fn wrap<T: Pluggable + ?Sized>(self: &Arc<Self>, target: Arc<T>) -> Arc<T> {
        if !self.targets(T::POINT) {
            return target;
        }
        debug!(point = %T::POINT, "wrapping extension point");
        T::proxy(target, Arc::clone(self))
    }

    /// Runs the interceptor for one call.
    fn invoke(
        &self,
        method: Method,
        arguments: Arguments,
        target: &dyn Dispatch,
    ) -> Result<Outcome, ExtensionError> {
        self.interceptor.intercept(Invocation::new(method, arguments, target))
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("methods", &self.methods).finish_non_exhaustive()
    }
}

/// Extension-point trait objects that plugins can wrap.
pub trait Pluggable: Send + Sync + 'static {
    /// Extension point implemented by `Self`.
    const POINT: ExtensionPoint;

    /// Builds a proxy routing declared calls through `plugin`.
    fn proxy(target: Arc<Self>, plugin: Arc<Plugin>) -> Arc<Self>;
}

// ============================================================================
// SECTION: Interceptor Chain
// ============================================================================

/// Ordered plugin registrations.
#[derive(Debug, Clone, Default)]
pub struct InterceptorChain {
    /// Plugins in registration order.
    plugins: Vec<Arc<Plugin>>,
}

impl InterceptorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin after every existing one.
    pub fn add(&mut self, plugin: Plugin) {
        self.plugins.push(Arc::new(plugin));
    }

    /// Wraps `target` with every plugin in registration order.
    #[must_use]
    pub fn plugin_all<T: Pluggable + ?Sized>(&self, target: Arc<T>) -> Arc<T> {
        self.plugins.iter().fold(target, |wrapped, plugin| plugin.wrap(wrapped))
    }

    /// Iterates plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.plugins.iter()
    }

    /// Returns the number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true when no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Builds the argument-mismatch error.
fn mismatch(method: Method) -> ExtensionError {
    ExtensionError::ArgumentMismatch {
        method: method.to_string(),
    }
}

// ============================================================================
// SECTION: Executor Proxy
// ============================================================================

/// Dispatches invocations to an executor.
struct ExecutorTarget<'a>(&'a dyn Executor);

impl Dispatch for ExecutorTarget<'_> {
    fn dispatch(&self, method: Method, arguments: Arguments) -> Result<Outcome, ExtensionError> {
        match (method, arguments) {
            (
                Method::ExecutorQuery,
                Arguments::Query {
                    statement,
                    parameter,
                    bounds,
                },
            ) => self.0.query(&statement, &parameter, bounds).map(Outcome::Rows),
            (
                Method::ExecutorUpdate,
                Arguments::Update {
                    statement,
                    parameter,
                },
            ) => self.0.update(&statement, &parameter).map(Outcome::Count),
            (
                Method::ExecutorCommit,
                Arguments::Transaction {
                    required,
                },
            ) => self.0.commit(required).map(|()| Outcome::Done),
            (
                Method::ExecutorRollback,
                Arguments::Transaction {
                    required,
                },
            ) => self.0.rollback(required).map(|()| Outcome::Done),
            (method, _) => Err(mismatch(method)),
        }
    }
}

/// Executor wrapped by one plugin.
struct ExecutorProxy {
    /// Wrapped executor.
    target: Arc<dyn Executor>,
    /// Routing plugin.
    plugin: Arc<Plugin>,
}

impl Executor for ExecutorProxy {
    fn query(
        &self,
        statement: &MappedStatement,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Row>, ExtensionError> {
        let method = Method::ExecutorQuery;
        if !self.plugin.intercepts(method) {
            return self.target.query(statement, parameter, bounds);
        }
        let arguments = Arguments::Query {
            statement: statement.clone(),
            parameter: parameter.clone(),
            bounds,
        };
        self.plugin.invoke(method, arguments, &ExecutorTarget(&*self.target))?.into_rows(method)
    }

    fn update(&self, statement: &MappedStatement, parameter: &Value) -> Result<u64, ExtensionError> {
        let method = Method::ExecutorUpdate;
        if !self.plugin.intercepts(method) {
            return self.target.update(statement, parameter);
        }
        let arguments = Arguments::Update {
            statement: statement.clone(),
            parameter: parameter.clone(),
        };
        self.plugin.invoke(method, arguments, &ExecutorTarget(&*self.target))?.into_count(method)
    }

    fn commit(&self, required: bool) -> Result<(), ExtensionError> {
        let method = Method::ExecutorCommit;
        if !self.plugin.intercepts(method) {
            return self.target.commit(required);
        }
        let arguments = Arguments::Transaction {
            required,
        };
        self.plugin.invoke(method, arguments, &ExecutorTarget(&*self.target))?.into_done(method)
    }

    fn rollback(&self, required: bool) -> Result<(), ExtensionError> {
        let method = Method::ExecutorRollback;
        if !self.plugin.intercepts(method) {
            return self.target.rollback(required);
        }
        let arguments = Arguments::Transaction {
            required,
        };
        self.plugin.invoke(method, arguments, &ExecutorTarget(&*self.target))?.into_done(method)
    }
}

impl Pluggable for dyn Executor {
    const POINT: ExtensionPoint = ExtensionPoint::Executor;

    fn proxy(target: Arc<Self>, plugin: Arc<Plugin>) -> Arc<Self> {
        Arc::new(ExecutorProxy {
            target,
            plugin,
        })
    }
}

// ============================================================================
// SECTION: Parameter Handler Proxy
// ============================================================================

/// Dispatches invocations to a parameter handler.
struct ParameterTarget<'a>(&'a dyn ParameterHandler);

impl Dispatch for ParameterTarget<'_> {
    fn dispatch(&self, method: Method, arguments: Arguments) -> Result<Outcome, ExtensionError> {
        match (method, arguments) {
            (Method::ParameterObject, Arguments::Empty) => self.0.parameter_object().map(Outcome::Value),
            (
                Method::BindParameters,
                Arguments::Prepared {
                    mut statement,
                },
            ) => {
                self.0.bind_parameters(&mut statement)?;
                Ok(Outcome::Prepared(statement))
            }
            (method, _) => Err(mismatch(method)),
        }
    }
}

/// Parameter handler wrapped by one plugin.
struct ParameterProxy {
    /// Wrapped handler.
    target: Arc<dyn ParameterHandler>,
    /// Routing plugin.
    plugin: Arc<Plugin>,
}

impl ParameterHandler for ParameterProxy {
    fn parameter_object(&self) -> Result<Value, ExtensionError> {
        let method = Method::ParameterObject;
        if !self.plugin.intercepts(method) {
            return self.target.parameter_object();
        }
        self.plugin
            .invoke(method, Arguments::Empty, &ParameterTarget(&*self.target))?
            .into_value(method)
    }

    fn bind_parameters(&self, statement: &mut PreparedSql) -> Result<(), ExtensionError> {
        let method = Method::BindParameters;
        if !self.plugin.intercepts(method) {
            return self.target.bind_parameters(statement);
        }
        let arguments = Arguments::Prepared {
            statement: statement.clone(),
        };
        *statement = self
            .plugin
            .invoke(method, arguments, &ParameterTarget(&*self.target))?
            .into_prepared(method)?;
        Ok(())
    }
}

impl Pluggable for dyn ParameterHandler {
    const POINT: ExtensionPoint = ExtensionPoint::ParameterHandler;

    fn proxy(target: Arc<Self>, plugin: Arc<Plugin>) -> Arc<Self> {
        Arc::new(ParameterProxy {
            target,
            plugin,
        })
    }
}

// ============================================================================
// SECTION: Result Set Handler Proxy
// ============================================================================

/// Dispatches invocations to a result set handler.
struct ResultSetTarget<'a>(&'a dyn ResultSetHandler);

impl Dispatch for ResultSetTarget<'_> {
    fn dispatch(&self, method: Method, arguments: Arguments) -> Result<Outcome, ExtensionError> {
        match (method, arguments) {
            (
                Method::HandleResultSets,
                Arguments::Prepared {
                    statement,
                },
            ) => self.0.handle_result_sets(&statement).map(Outcome::Rows),
            (method, _) => Err(mismatch(method)),
        }
    }
}

/// Result set handler wrapped by one plugin.
struct ResultSetProxy {
    /// Wrapped handler.
    target: Arc<dyn ResultSetHandler>,
    /// Routing plugin.
    plugin: Arc<Plugin>,
}

impl ResultSetHandler for ResultSetProxy {
    fn handle_result_sets(&self, statement: &PreparedSql) -> Result<Vec<Row>, ExtensionError> {
        let method = Method::HandleResultSets;
        if !self.plugin.intercepts(method) {
            return self.target.handle_result_sets(statement);
        }
        let arguments = Arguments::Prepared {
            statement: statement.clone(),
        };
        self.plugin.invoke(method, arguments, &ResultSetTarget(&*self.target))?.into_rows(method)
    }
}

impl Pluggable for dyn ResultSetHandler {
    const POINT: ExtensionPoint = ExtensionPoint::ResultSetHandler;

    fn proxy(target: Arc<Self>, plugin: Arc<Plugin>) -> Arc<Self> {
        Arc::new(ResultSetProxy {
            target,
            plugin,
        })
    }
}

// ============================================================================
// SECTION: Statement Handler Proxy
// ============================================================================

/// Dispatches invocations to a statement handler.
struct StatementTarget<'a>(&'a dyn StatementHandler);

impl Dispatch for StatementTarget<'_> {
    fn dispatch(&self, method: Method, arguments: Arguments) -> Result<Outcome, ExtensionError> {
        match (method, arguments) {
            (
                Method::StatementPrepare,
                Arguments::Timeout {
                    timeout,
                },
            ) => self.0.prepare(timeout).map(Outcome::Prepared),
            (
                Method::StatementQuery,
                Arguments::Prepared {
                    statement,
                },
            ) => self.0.query(&statement).map(Outcome::Rows),
            (
                Method::StatementUpdate,
                Arguments::Prepared {
                    statement,
                },
            ) => self.0.update(&statement).map(Outcome::Count),
            (method, _) => Err(mismatch(method)),
        }
    }
}

/// Statement handler wrapped by one plugin.
struct StatementProxy {
    /// Wrapped handler.
    target: Arc<dyn StatementHandler>,
    /// Routing plugin.
    plugin: Arc<Plugin>,
}

impl StatementHandler for StatementProxy {
    fn prepare(&self, timeout: Option<u32>) -> Result<PreparedSql, ExtensionError> {
        let method = Method::StatementPrepare;
        if !self.plugin.intercepts(method) {
            return self.target.prepare(timeout);
        }
        let arguments = Arguments::Timeout {
            timeout,
        };
        self.plugin
            .invoke(method, arguments, &StatementTarget(&*self.target))?
            .into_prepared(method)
    }

    fn query(&self, statement: &PreparedSql) -> Result<Vec<Row>, ExtensionError> {
        let method = Method::StatementQuery;
        if !self.plugin.intercepts(method) {
            return self.target.query(statement);
        }
        let arguments = Arguments::Prepared {
            statement: statement.clone(),
        };
        self.plugin.invoke(method, arguments, &StatementTarget(&*self.target))?.into_rows(method)
    }

    fn update(&self, statement: &PreparedSql) -> Result<u64, ExtensionError> {
        let method = Method::StatementUpdate;
        if !self.plugin.intercepts(method) {
            return self.target.update(statement);
        }
        let arguments = Arguments::Prepared {
            statement: statement.clone(),
        };
        self.plugin.invoke(method, arguments, &StatementTarget(&*self.target))?.into_count(method)
    }
}

impl Pluggable for dyn StatementHandler {
    const POINT: ExtensionPoint = ExtensionPoint::StatementHandler;

    fn proxy(target: Arc<Self>, plugin: Arc<Plugin>) -> Arc<Self> {
        Arc::new(StatementProxy {
            target,
            plugin,
        })
    }
}
