// crates/rowbind-core/src/plugin/tests.rs
// ============================================================================
// Module: Interception Pipeline Tests
// Description: Unit tests for signature resolution and proxy dispatch.
// Purpose: Validate chain ordering, pass-through, and short-circuiting.
// Dependencies: rowbind-core, serde_json
// ============================================================================

//! ## Overview
//! Uses recording interceptors over in-memory extension points.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use super::Arguments;
use super::Interceptor;
use super::InterceptorChain;
use super::Invocation;
use super::Method;
use super::Outcome;
use super::Plugin;
use super::PluginError;
use super::Signature;
use crate::core::statement::MappedStatement;
use crate::interfaces::Executor;
use crate::interfaces::ExtensionError;
use crate::interfaces::PreparedSql;
use crate::interfaces::Row;
use crate::interfaces::RowBounds;
use crate::interfaces::StatementHandler;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

struct RecordingExecutor {
    log: Log,
}

impl Executor for RecordingExecutor {
    fn query(
        &self,
        _statement: &MappedStatement,
        _parameter: &Value,
        _bounds: RowBounds,
    ) -> Result<Vec<Row>, ExtensionError> {
        self.log.lock().unwrap().push("target.query".to_string());
        Ok(vec![Row::new()])
    }

    fn update(&self, _statement: &MappedStatement, _parameter: &Value) -> Result<u64, ExtensionError> {
        self.log.lock().unwrap().push("target.update".to_string());
        Ok(1)
    }

    fn commit(&self, required: bool) -> Result<(), ExtensionError> {
        self.log.lock().unwrap().push(format!("target.commit({required})"));
        Ok(())
    }

    fn rollback(&self, required: bool) -> Result<(), ExtensionError> {
        self.log.lock().unwrap().push(format!("target.rollback({required})"));
        Ok(())
    }
}

struct NoopStatements;

impl StatementHandler for NoopStatements {
    fn prepare(&self, timeout: Option<u32>) -> Result<PreparedSql, ExtensionError> {
        let mut prepared = PreparedSql::new("select 1");
        prepared.timeout = timeout;
        Ok(prepared)
    }

    fn query(&self, _statement: &PreparedSql) -> Result<Vec<Row>, ExtensionError> {
        Ok(Vec::new())
    }

    fn update(&self, _statement: &PreparedSql) -> Result<u64, ExtensionError> {
        Ok(0)
    }
}

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Interceptor for Recorder {
    fn intercept(&self, invocation: Invocation<'_>) -> Result<Outcome, ExtensionError> {
        self.log.lock().unwrap().push(self.name.to_string());
        invocation.proceed()
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::new("Executor", "commit", &["bool"])]
    }
}

struct FlipRequired;

impl Interceptor for FlipRequired {
    fn intercept(&self, mut invocation: Invocation<'_>) -> Result<Outcome, ExtensionError> {
        if let Arguments::Transaction {
            required,
        } = invocation.arguments_mut()
        {
            *required = !*required;
        }
        invocation.proceed()
    }
}

struct Fixed(Outcome);

impl Interceptor for Fixed {
    fn intercept(&self, _invocation: Invocation<'_>) -> Result<Outcome, ExtensionError> {
        Ok(self.0.clone())
    }
}

fn executor(log: &Log) -> Arc<dyn Executor> {
    Arc::new(RecordingExecutor {
        log: Arc::clone(log),
    })
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ============================================================================
// SECTION: Registration Tests
// ============================================================================

#[test]
fn unknown_method_is_rejected_at_registration() {
    let signature = Signature::new("Executor", "query", &["MappedStatement", "Parameter"]);
    let err = Plugin::new(Arc::new(FlipRequired), &[signature]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "could not find method on Executor named query with arguments (MappedStatement, Parameter)"
    );
}

#[test]
fn unknown_point_is_rejected_at_registration() {
    let signature = Signature::new("Connection", "close", &[]);
    let err = Plugin::new(Arc::new(FlipRequired), &[signature]).unwrap_err();
    assert!(matches!(err, PluginError::UnknownPoint { ref point } if point == "Connection"));
}

#[test]
fn interceptor_without_signatures_is_rejected() {
    let err = Plugin::new(Arc::new(FlipRequired), &[]).unwrap_err();
    assert!(matches!(err, PluginError::NoSignatures { .. }));
}

#[test]
fn parsed_signature_resolves_method() {
    let signature = Signature::parse(" StatementHandler ", "prepare", "Timeout");
    assert_eq!(signature.resolve().unwrap(), Method::StatementPrepare);
    assert_eq!(
        Method::ExecutorQuery.to_string(),
        "Executor.query(MappedStatement, Parameter, RowBounds)"
    );
}

// ============================================================================
// SECTION: Dispatch Tests
// ============================================================================

#[test]
fn untargeted_point_is_returned_unwrapped() {
    let log = Log::default();
    let plugin = Arc::new(
        Plugin::new(
            Arc::new(Recorder {
                name: "I1",
                log,
            }),
            &[],
        )
        .unwrap(),
    );
    let statements: Arc<dyn StatementHandler> = Arc::new(NoopStatements);
    let wrapped = plugin.wrap(Arc::clone(&statements));
    assert!(Arc::ptr_eq(&statements, &wrapped));
}

#[test]
fn last_registered_interceptor_runs_first() {
    let log = Log::default();
    let mut chain = InterceptorChain::new();
    for name in ["I1", "I2"] {
        let recorder = Recorder {
            name,
            log: Arc::clone(&log),
        };
        chain.add(Plugin::new(Arc::new(recorder), &[]).unwrap());
    }
    let wrapped = chain.plugin_all(executor(&log));
    wrapped.commit(true).unwrap();
    assert_eq!(entries(&log), vec!["I2", "I1", "target.commit(true)"]);
}

#[test]
fn undeclared_methods_pass_straight_through() {
    let log = Log::default();
    let mut chain = InterceptorChain::new();
    let recorder = Recorder {
        name: "I1",
        log: Arc::clone(&log),
    };
    chain.add(Plugin::new(Arc::new(recorder), &[]).unwrap());
    let wrapped = chain.plugin_all(executor(&log));
    wrapped.rollback(false).unwrap();
    assert_eq!(entries(&log), vec!["target.rollback(false)"]);
}

#[test]
fn interceptor_can_rewrite_arguments() {
    let log = Log::default();
    let signature = Signature::new("Executor", "commit", &["bool"]);
    let plugin = Arc::new(Plugin::new(Arc::new(FlipRequired), &[signature]).unwrap());
    plugin.wrap(executor(&log)).commit(true).unwrap();
    assert_eq!(entries(&log), vec!["target.commit(false)"]);
}

#[test]
fn interceptor_can_short_circuit() {
    let signature = Signature::new("StatementHandler", "update", &["PreparedSql"]);
    let plugin = Arc::new(Plugin::new(Arc::new(Fixed(Outcome::Count(42))), &[signature]).unwrap());
    let statements: Arc<dyn StatementHandler> = Arc::new(NoopStatements);
    let wrapped = plugin.wrap(statements);
    assert_eq!(wrapped.update(&PreparedSql::new("update blog")).unwrap(), 42);
    assert_eq!(wrapped.prepare(Some(5)).unwrap().timeout, Some(5));
}

#[test]
fn wrong_outcome_kind_is_reported() {
    let signature = Signature::new("StatementHandler", "query", &["PreparedSql"]);
    let plugin = Arc::new(Plugin::new(Arc::new(Fixed(Outcome::Done)), &[signature]).unwrap());
    let statements: Arc<dyn StatementHandler> = Arc::new(NoopStatements);
    let err = plugin.wrap(statements).query(&PreparedSql::new("select 1")).unwrap_err();
    assert!(matches!(err, ExtensionError::OutcomeMismatch { expected: "rows", actual: "done", .. }));
}
