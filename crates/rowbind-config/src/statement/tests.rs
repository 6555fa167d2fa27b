// crates/rowbind-config/src/statement/tests.rs
// ============================================================================
// Module: Statement Builder Tests
// Description: Unit tests for statement assembly and defaults.
// Purpose: Confirm include splicing, key handling, waiting, and defaults.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! Builds statement nodes against hand-populated configurations.

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

use rowbind_core::CachePolicy;
use rowbind_core::DatabaseId;
use rowbind_core::Namespace;
use rowbind_core::NamespaceCache;
use rowbind_core::Node;
use rowbind_core::QualifiedId;
use rowbind_core::SqlSegment;
use rowbind_core::StatementKind;
use rowbind_core::StatementType;
use rowbind_core::TypeName;
use rowbind_core::UnitId;

use super::BuiltStatement;
use super::StatementTask;
use super::build_statement;
use crate::configuration::Configuration;
use crate::configuration::Fragment;
use crate::error::MappingError;
use crate::pending::Resolution;
use crate::pending::Unmet;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn namespace() -> Namespace {
    Namespace::new("blog").unwrap()
}

fn attempt(config: &Configuration, node: Node) -> Result<Resolution<BuiltStatement>, MappingError> {
    let task = StatementTask {
        namespace: namespace(),
        node,
    };
    build_statement(config, &UnitId::new("blog.toml"), &task)
}

fn built(config: &Configuration, node: Node) -> BuiltStatement {
    match attempt(config, node).unwrap() {
        Resolution::Ready(built) => built,
        Resolution::Pending(unmet) => panic!("unexpected pending: {unmet}"),
    }
}

fn waiting(config: &Configuration, node: Node) -> Unmet {
    match attempt(config, node).unwrap() {
        Resolution::Ready(built) => panic!("unexpected ready: {}", built.statement.id),
        Resolution::Pending(unmet) => unmet,
    }
}

fn add_fragment(config: &mut Configuration, id: &str, node: Node) {
    config.sql_fragments.insert(namespace().declare(id).unwrap(), Fragment {
        node,
        database_id: None,
    });
}

fn include(refid: &str) -> Node {
    Node::new("include").with_attr("refid", refid)
}

// ============================================================================
// SECTION: SQL Assembly
// ============================================================================

#[test]
fn include_is_spliced_with_scoped_properties() {
    let mut config = Configuration::new();
    add_fragment(&mut config, "columns", Node::new("sql").with_attr("id", "columns").with_text("${alias}.id, ${alias}.title"));
    let node = Node::new("select")
        .with_attr("id", "findAll")
        .with_attr("resultType", "Blog")
        .with_text("select")
        .with_child(
            include("columns")
                .with_child(Node::new("property").with_attr("name", "alias").with_attr("value", "b")),
        )
        .with_child(Node::text_segment("from blogs b"));

    let built = built(&config, node);

    assert_eq!(built.statement.sql.segments, vec![SqlSegment::Text(
        "select b.id, b.title from blogs b".to_string()
    )]);
    let inline = built.inline_shape.unwrap();
    assert_eq!(inline.id.as_str(), "blog.findAll-Inline");
    assert_eq!(inline.type_name, TypeName::new("Blog"));
    assert_eq!(built.statement.result_shapes, vec![inline.id.clone()]);
}

#[test]
fn refid_may_come_from_an_enclosing_include_property() {
    let mut config = Configuration::new();
    add_fragment(&mut config, "columns", Node::new("sql").with_attr("id", "columns").with_text("id"));
    add_fragment(&mut config, "outer", Node::new("sql").with_attr("id", "outer").with_child(include("${cols}")));
    let node = Node::new("select").with_attr("id", "ids").with_text("select").with_child(
        include("outer").with_child(Node::new("property").with_attr("name", "cols").with_attr("value", "columns")),
    );

    let built = built(&config, node);

    assert_eq!(built.statement.sql.segments, vec![SqlSegment::Text("select id".to_string())]);
}

#[test]
fn configuration_variables_are_not_expanded_again() {
    let mut config = Configuration::new();
    config.variables.insert("table".to_string(), "blogs".to_string());
    let node = Node::new("select").with_attr("id", "raw").with_text("select * from ${table}");

    let built = built(&config, node);

    assert_eq!(built.statement.sql.segments, vec![SqlSegment::Text("select * from ${table}".to_string())]);
}

#[test]
fn missing_fragment_keeps_statement_waiting() {
    let config = Configuration::new();
    let node = Node::new("select").with_attr("id", "findAll").with_child(include("columns"));

    assert_eq!(waiting(&config, node), Unmet::SqlFragment(QualifiedId::raw("blog.columns")));
}

#[test]
fn circular_include_is_fatal() {
    let mut config = Configuration::new();
    add_fragment(&mut config, "a", Node::new("sql").with_attr("id", "a").with_child(include("b")));
    add_fragment(&mut config, "b", Node::new("sql").with_attr("id", "b").with_child(include("a")));
    let node = Node::new("select").with_attr("id", "loop").with_child(include("a"));

    let err = attempt(&config, node).unwrap_err();

    assert_eq!(err, MappingError::CircularInclude {
        id: QualifiedId::raw("blog.a"),
    });
}

#[test]
fn dynamic_elements_survive_with_substituted_attributes() {
    let mut config = Configuration::new();
    config.variables.insert("column".to_string(), "title".to_string());
    let node = Node::new("select").with_attr("id", "search").with_text("select * from blog").with_child(
        Node::new("where").with_child(
            Node::new("if").with_attr("test", "${column} != null").with_text("${column} = #{value}"),
        ),
    );

    let built = built(&config, node);

    let segments = &built.statement.sql.segments;
    assert_eq!(segments.len(), 2);
    let SqlSegment::Dynamic(dynamic) = &segments[1] else {
        panic!("expected dynamic segment");
    };
    assert_eq!(dynamic.name, "where");
    let condition = dynamic.child("if").unwrap();
    assert_eq!(condition.attr("test"), Some("title != null"));
    assert_eq!(condition.text_content(), "title = #{value}");
    assert!(built.statement.sql.is_dynamic());
}

// ============================================================================
// SECTION: Keys
// ============================================================================

#[test]
fn select_key_disables_generated_keys_and_leaves_the_body() {
    let mut config = Configuration::new();
    config.settings_mut().use_generated_keys = true;
    let node = Node::new("insert")
        .with_attr("id", "insertBlog")
        .with_child(
            Node::new("selectKey")
                .with_attr("keyProperty", "id")
                .with_attr("resultType", "long")
                .with_attr("order", "before")
                .with_text("select nextval('blog_seq')"),
        )
        .with_child(Node::text_segment("insert into blog (id) values (#{id})"));

    let statement = built(&config, node).statement;

    assert_eq!(statement.kind, StatementKind::Insert);
    assert_eq!(statement.sql.segments, vec![SqlSegment::Text("insert into blog (id) values (#{id})".to_string())]);
    assert!(!statement.keys.use_generated_keys);
    assert_eq!(statement.keys.key_properties, vec!["id".to_string()]);
    let select_key = statement.keys.select_key.unwrap();
    assert!(select_key.before);
    assert_eq!(select_key.result_type, Some(TypeName::new("i64")));
    assert_eq!(select_key.sql.segments, vec![SqlSegment::Text("select nextval('blog_seq')".to_string())]);
}

#[test]
fn generated_keys_default_to_the_setting_for_inserts_only() {
    let mut config = Configuration::new();
    config.settings_mut().use_generated_keys = true;
    let insert = Node::new("insert")
        .with_attr("id", "insertBlog")
        .with_attr("keyProperty", "id, slug")
        .with_attr("keyColumn", "blog_id")
        .with_text("insert into blog values (#{title})");
    let update = Node::new("update").with_attr("id", "touch").with_text("update blog set touched = 1");

    let insert = built(&config, insert).statement;
    let update = built(&config, update).statement;

    assert!(insert.keys.use_generated_keys);
    assert_eq!(insert.keys.key_properties, vec!["id".to_string(), "slug".to_string()]);
    assert_eq!(insert.keys.key_columns, vec!["blog_id".to_string()]);
    assert!(!update.keys.use_generated_keys);
}

#[test]
fn unknown_select_key_order_is_rejected() {
    let config = Configuration::new();
    let node = Node::new("insert")
        .with_attr("id", "insertBlog")
        .with_child(Node::new("selectKey").with_attr("order", "during").with_text("select 1"));

    let err = attempt(&config, node).unwrap_err();

    assert!(matches!(err, MappingError::Unsupported { attribute, .. } if attribute == "order"));
}

// ============================================================================
// SECTION: Defaults and Flags
// ============================================================================

#[test]
fn cache_flags_default_by_statement_kind() {
    let mut config = Configuration::new();
    config.settings_mut().default_fetch_size = Some(100);
    config.settings_mut().default_statement_timeout = Some(30);
    let select = Node::new("select").with_attr("id", "list").with_attr("timeout", "5").with_text("select 1");
    let delete = Node::new("delete").with_attr("id", "purge").with_text("delete from blog");

    let select = built(&config, select).statement;
    let delete = built(&config, delete).statement;

    assert!(select.use_cache);
    assert!(!select.flush_cache);
    assert_eq!(select.fetch_size, Some(100));
    assert_eq!(select.timeout, Some(5));
    assert!(!delete.use_cache);
    assert!(delete.flush_cache);
    assert_eq!(delete.statement_type, StatementType::Prepared);
}

#[test]
fn statement_attributes_are_read() {
    let config = Configuration::new();
    let node = Node::new("select")
        .with_attr("id", "call")
        .with_attr("statementType", "callable")
        .with_attr("databaseId", "pg")
        .with_attr("parameterType", "map")
        .with_attr("resultOrdered", "true")
        .with_attr("resultSets", "blogs,authors")
        .with_text("{call load_blogs()}");

    let statement = built(&config, node).statement;

    assert_eq!(statement.statement_type, StatementType::Callable);
    assert_eq!(statement.database_id, Some(DatabaseId::new("pg")));
    assert_eq!(statement.parameter_type, Some(TypeName::new("map")));
    assert!(statement.result_ordered);
    assert_eq!(statement.result_sets, vec!["blogs".to_string(), "authors".to_string()]);
}

#[test]
fn unknown_statement_type_is_rejected() {
    let config = Configuration::new();
    let node = Node::new("select").with_attr("id", "q").with_attr("statementType", "batch").with_text("select 1");

    let err = attempt(&config, node).unwrap_err();

    assert!(matches!(err, MappingError::Unsupported { attribute, .. } if attribute == "statementType"));
}

// ============================================================================
// SECTION: References
// ============================================================================

#[test]
fn unregistered_shapes_keep_statement_waiting() {
    let config = Configuration::new();
    let by_parameters = Node::new("select").with_attr("id", "a").with_attr("parameterMap", "params").with_text("select 1");
    let by_results =
        Node::new("select").with_attr("id", "b").with_attr("resultMap", "authors.authorMap").with_text("select 1");

    assert_eq!(waiting(&config, by_parameters), Unmet::ParameterShape(QualifiedId::raw("blog.params")));
    assert_eq!(waiting(&config, by_results), Unmet::ResultShape(QualifiedId::raw("authors.authorMap")));
}

#[test]
fn unresolved_cache_reference_keeps_statement_waiting() {
    let mut config = Configuration::new();
    let target = Namespace::new("authors").unwrap();
    config.unresolved_cache_refs.insert(namespace(), target.clone());
    let node = Node::new("select").with_attr("id", "a").with_text("select 1");

    assert_eq!(waiting(&config, node), Unmet::CacheRef(target));
}

#[test]
fn namespace_cache_is_attached_only_when_caching_is_enabled() {
    let mut config = Configuration::new();
    let cache = NamespaceCache::new(namespace(), CachePolicy::default()).unwrap();
    config.register_cache(namespace(), cache).unwrap();
    let node = Node::new("select").with_attr("id", "a").with_text("select 1");

    let cached = built(&config, node.clone()).statement;
    config.settings_mut().cache_enabled = false;
    let uncached = built(&config, node).statement;

    assert!(Arc::ptr_eq(cached.cache.as_ref().unwrap(), config.cache("blog").unwrap()));
    assert_eq!(cached.cache_id(), Some("blog"));
    assert!(uncached.cache.is_none());
}
