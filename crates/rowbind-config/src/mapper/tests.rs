// crates/rowbind-config/src/mapper/tests.rs
// ============================================================================
// Module: Mapping Unit Parser Tests
// Description: Unit tests for declaration order and database passes.
// Purpose: Confirm shadowing, in-unit deferral, and cache declaration rules.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! Parses single mapping units through [`super::parse_unit`].

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use rowbind_core::DatabaseId;
use rowbind_core::Node;
use rowbind_core::SqlSegment;
use rowbind_core::UnitId;

use super::parse_unit;
use crate::configuration::Configuration;
use crate::error::MappingError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn unit(namespace: &str) -> Node {
    Node::new("mapper").with_attr("namespace", namespace)
}

fn statement(id: &str, database: Option<&str>, sql: &str) -> Node {
    let node = Node::new("select").with_attr("id", id).with_text(sql);
    match database {
        Some(database) => node.with_attr("databaseId", database),
        None => node,
    }
}

fn parse(config: &mut Configuration, node: &Node) -> Result<(), MappingError> {
    parse_unit(config, &UnitId::new("unit.toml"), node)
}

fn sql_text(config: &Configuration, id: &str) -> String {
    let statement = config.statement(id).unwrap().unwrap();
    match &statement.sql.segments[..] {
        [SqlSegment::Text(text)] => text.clone(),
        _ => panic!("expected a single text segment"),
    }
}

// ============================================================================
// SECTION: Database Passes
// ============================================================================

#[test]
fn active_database_statement_shadows_unqualified_one() {
    let mut config = Configuration::new();
    config.set_database_id(Some(DatabaseId::new("pg")));
    let node = unit("blog")
        .with_child(statement("a", None, "select generic"))
        .with_child(statement("a", Some("pg"), "select pg"))
        .with_child(statement("b", Some("mysql"), "select mysql"))
        .with_child(statement("b", None, "select generic b"));

    parse(&mut config, &node).unwrap();

    assert_eq!(config.statements().len(), 2);
    assert_eq!(sql_text(&config, "blog.a"), "select pg");
    assert_eq!(config.statement("blog.a").unwrap().unwrap().database_id, Some(DatabaseId::new("pg")));
    assert_eq!(sql_text(&config, "blog.b"), "select generic b");
}

#[test]
fn qualified_statements_are_ignored_without_an_active_database() {
    let mut config = Configuration::new();
    let node = unit("blog")
        .with_child(statement("a", Some("pg"), "select pg"))
        .with_child(statement("a", None, "select generic"));

    parse(&mut config, &node).unwrap();

    assert_eq!(config.statements().len(), 1);
    assert_eq!(sql_text(&config, "blog.a"), "select generic");
}

#[test]
fn active_database_fragment_shadows_unqualified_one() {
    let mut config = Configuration::new();
    config.set_database_id(Some(DatabaseId::new("pg")));
    let node = unit("blog")
        .with_child(Node::new("sql").with_attr("id", "columns").with_text("generic_columns"))
        .with_child(Node::new("sql").with_attr("id", "columns").with_attr("databaseId", "pg").with_text("pg_columns"))
        .with_child(
            Node::new("select")
                .with_attr("id", "a")
                .with_text("select")
                .with_child(Node::new("include").with_attr("refid", "columns")),
        );

    parse(&mut config, &node).unwrap();

    assert_eq!(sql_text(&config, "blog.a"), "select pg_columns");
}

// ============================================================================
// SECTION: Declaration Order
// ============================================================================

#[test]
fn shape_extending_a_later_sibling_is_deferred() {
    let mut config = Configuration::new();
    let node = unit("blog")
        .with_child(Node::new("resultMap").with_attr("id", "child").with_attr("extends", "base"))
        .with_child(Node::new("resultMap").with_attr("id", "base").with_attr("type", "Blog"));

    parse(&mut config, &node).unwrap();

    assert_eq!(config.pending_count(), 1);
    assert_eq!(config.retry_pending().unwrap(), 1);
    assert!(config.result_shape("blog.child").unwrap().is_some());
}

#[test]
fn parameter_maps_are_registered() {
    let mut config = Configuration::new();
    let node = unit("blog").with_child(
        Node::new("parameterMap")
            .with_attr("id", "params")
            .with_child(Node::new("parameter").with_attr("property", "id")),
    );

    parse(&mut config, &node).unwrap();

    assert!(config.parameter_shapes().contains("blog.params"));
}

#[test]
fn empty_namespace_is_rejected() {
    let mut config = Configuration::new();
    let err = parse(&mut config, &unit("  ")).unwrap_err();
    assert_eq!(err, MappingError::EmptyNamespace);
}

#[test]
fn foreign_qualified_statement_id_is_rejected() {
    let mut config = Configuration::new();
    let node = unit("blog").with_child(statement("authors.a", None, "select 1"));

    let err = parse(&mut config, &node).unwrap_err();

    assert!(matches!(err, MappingError::Identifier(_)));
}

// ============================================================================
// SECTION: Caches
// ============================================================================

#[test]
fn cache_and_cache_reference_are_mutually_exclusive() {
    let mut config = Configuration::new();
    let node = unit("blog")
        .with_child(Node::new("cache"))
        .with_child(Node::new("cache-ref").with_attr("namespace", "authors"));

    let err = parse(&mut config, &node).unwrap_err();

    assert_eq!(err, MappingError::CacheAndCacheRef {
        namespace: "blog".to_string(),
    });
}

#[test]
fn namespace_declares_its_cache_once() {
    let mut config = Configuration::new();
    parse(&mut config, &unit("blog").with_child(Node::new("cache"))).unwrap();

    let err = parse(&mut config, &unit("blog").with_child(Node::new("cache"))).unwrap_err();

    assert_eq!(err, MappingError::DuplicateCache {
        namespace: "blog".to_string(),
    });
}

#[test]
fn cache_reference_to_a_loaded_namespace_binds_immediately() {
    let mut config = Configuration::new();
    parse(&mut config, &unit("authors").with_child(Node::new("cache"))).unwrap();

    parse(&mut config, &unit("blog").with_child(Node::new("cache-ref").with_attr("namespace", "authors"))).unwrap();

    assert_eq!(config.pending_count(), 0);
    assert_eq!(config.cache("blog").unwrap().id().as_str(), "authors");
}
