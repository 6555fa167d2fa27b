// crates/rowbind-core/src/core/node/tests.rs
// ============================================================================
// Module: Document Node Tests
// Description: Unit tests for attribute access and mixed-content traversal.
// Purpose: Validate node helpers used by the mapping parsers.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! Covers attribute parsing, child selection, and `${...}` substitution.

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

use std::collections::BTreeMap;

use super::BodySegment;
use super::Node;
use super::NodeError;
use super::substitute_placeholders;

// ============================================================================
// SECTION: Attribute Tests
// ============================================================================

#[test]
fn bool_attr_accepts_any_case() {
    let node = Node::new("cache").with_attr("readOnly", "TRUE").with_attr("blocking", "False");
    assert_eq!(node.bool_attr("readOnly").unwrap(), Some(true));
    assert_eq!(node.bool_attr("blocking").unwrap(), Some(false));
    assert_eq!(node.bool_attr("missing").unwrap(), None);
}

#[test]
fn bool_attr_rejects_other_values() {
    let node = Node::new("cache").with_attr("readOnly", "yes");
    let err = node.bool_attr("readOnly").unwrap_err();
    assert!(matches!(err, NodeError::InvalidAttribute { ref attribute, .. } if attribute == "readOnly"));
}

#[test]
fn numeric_attr_rejects_text() {
    let node = Node::new("cache").with_attr("size", "many");
    assert!(node.u64_attr("size").is_err());
    let node = Node::new("cache").with_attr("size", " 512 ");
    assert_eq!(node.u64_attr("size").unwrap(), Some(512));
}

#[test]
fn require_attr_names_node_and_attribute() {
    let err = Node::new("resultMap").require_attr("id").unwrap_err();
    assert_eq!(err.to_string(), "<resultMap> requires attribute 'id'");
}

#[test]
fn first_attr_follows_precedence() {
    let node = Node::new("collection").with_attr("ofType", "post").with_attr("javaType", "list");
    assert_eq!(node.first_attr(&["type", "ofType", "resultType", "javaType"]), Some("post"));
}

// ============================================================================
// SECTION: Child Tests
// ============================================================================

#[test]
fn children_named_keeps_document_order() {
    let node = Node::new("mapper")
        .with_child(Node::new("select").with_attr("id", "a"))
        .with_child(Node::new("sql").with_attr("id", "b"))
        .with_child(Node::new("update").with_attr("id", "c"));
    let ids: Vec<&str> =
        node.children_named("select|update").filter_map(|child| child.attr("id")).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn children_as_properties_collects_pairs() {
    let node = Node::new("cache")
        .with_child(Node::new("property").with_attr("name", "a").with_attr("value", "1"))
        .with_child(Node::new("property").with_attr("name", "b").with_attr("value", "2"));
    let properties = node.children_as_properties().unwrap();
    assert_eq!(properties.get("a").map(String::as_str), Some("1"));
    assert_eq!(properties.len(), 2);
}

#[test]
fn body_segments_interleave_text_and_elements() {
    let node = Node::new("select")
        .with_text("select * from blog")
        .with_child(Node::new("include").with_attr("refid", "cols"))
        .with_child(Node::text_segment("where id = #{id}"));
    let segments = node.body_segments();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0], BodySegment::Text("select * from blog"));
    assert!(matches!(segments[1], BodySegment::Element(child) if child.name == "include"));
    assert_eq!(node.children().count(), 1);
}

#[test]
fn value_based_identifier_replaces_dots() {
    let node = Node::new("association").with_attr("property", "author.address");
    assert_eq!(node.value_based_identifier(), "association[author_address]");
    let case = Node::new("case").with_attr("value", "1");
    assert_eq!(case.value_based_identifier(), "case[1]");
    assert_eq!(Node::new("constructor").value_based_identifier(), "constructor");
}

// ============================================================================
// SECTION: Substitution Tests
// ============================================================================

#[test]
fn substitution_keeps_unknown_placeholders() {
    let variables = BTreeMap::from([("table".to_string(), "blog".to_string())]);
    assert_eq!(
        substitute_placeholders("select ${cols} from ${table}", &variables),
        "select ${cols} from blog"
    );
    assert_eq!(substitute_placeholders("broken ${table", &variables), "broken ${table");
}

#[test]
fn substitute_variables_recurses_into_children() {
    let variables = BTreeMap::from([("alias".to_string(), "t1".to_string())]);
    let mut node = Node::new("sql")
        .with_attr("id", "${alias}_cols")
        .with_child(Node::text_segment("${alias}.id"));
    node.substitute_variables(&variables);
    assert_eq!(node.attr("id"), Some("t1_cols"));
    assert_eq!(node.text_content(), "t1.id");
}
