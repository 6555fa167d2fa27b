// crates/rowbind-core/src/core/node.rs
// ============================================================================
// Module: Rowbind Document Nodes
// Description: Format-neutral hierarchical document tree for mapping inputs.
// Purpose: Give parsers typed attribute access and ordered child traversal.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Mapping units and the global configuration are consumed as a tree of named
//! nodes with string attributes and ordered children. The concrete document
//! syntax is owned by whoever produces the tree; this module only defines the
//! reader contract. Mixed text content is modeled with children named
//! [`TEXT_NODE`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Node name used for text segments interleaved with elements.
pub const TEXT_NODE: &str = "#text";

/// Child name holding `name`/`value` property pairs.
const PROPERTY_NODE: &str = "property";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Node attribute access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Required attribute is missing.
    #[error("<{node}> requires attribute '{attribute}'")]
    MissingAttribute {
        /// Node name.
        node: String,
        /// Attribute name.
        attribute: String,
    },
    /// Attribute could not be parsed into the requested type.
    #[error("<{node}> attribute '{attribute}' has invalid value '{value}': expected {expected}")]
    InvalidAttribute {
        /// Node name.
        node: String,
        /// Attribute name.
        attribute: String,
        /// Raw attribute value.
        value: String,
        /// Expected value description.
        expected: &'static str,
    },
}

// ============================================================================
// SECTION: Node
// ============================================================================

/// One element of a mapping or configuration document.
///
/// # Invariants
/// - `children` preserve document order.
/// - Text segments are children named [`TEXT_NODE`] carrying `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Element name (`mapper`, `resultMap`, `select`).
    pub name: String,
    /// Attribute values keyed by attribute name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Leading text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Ordered child elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

/// One segment of a node's mixed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySegment<'a> {
    /// Literal text.
    Text(&'a str),
    /// Nested element.
    Element(&'a Node),
}

impl Node {
    /// Creates an empty node with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a text segment node.
    #[must_use]
    pub fn text_segment(text: impl Into<String>) -> Self {
        Self {
            name: TEXT_NODE.to_string(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Adds an attribute, returning the updated node.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the leading text, returning the updated node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Appends a child, returning the updated node.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the attribute value, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns the attribute value or the supplied default.
    #[must_use]
    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }

    /// Returns the first present attribute among `names`.
    #[must_use]
    pub fn first_attr(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.attr(name))
    }

    /// Returns a required attribute.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::MissingAttribute`] when the attribute is absent.
    pub fn require_attr(&self, name: &str) -> Result<&str, NodeError> {
        self.attr(name).ok_or_else(|| NodeError::MissingAttribute {
            node: self.name.clone(),
            attribute: name.to_string(),
        })
    }

    /// Parses a boolean attribute (`true`/`false`, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidAttribute`] for any other value.
    pub fn bool_attr(&self, name: &str) -> Result<Option<bool>, NodeError> {
        let Some(raw) = self.attr(name) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(self.invalid(name, raw, "true or false")),
        }
    }

    /// Parses an unsigned 64-bit attribute.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidAttribute`] when the value is not a number.
    pub fn u64_attr(&self, name: &str) -> Result<Option<u64>, NodeError> {
        self.attr(name)
            .map(|raw| raw.trim().parse::<u64>().map_err(|_| self.invalid(name, raw, "an unsigned integer")))
            .transpose()
    }

    /// Parses an unsigned 32-bit attribute.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidAttribute`] when the value is not a number.
    pub fn u32_attr(&self, name: &str) -> Result<Option<u32>, NodeError> {
        self.attr(name)
            .map(|raw| raw.trim().parse::<u32>().map_err(|_| self.invalid(name, raw, "an unsigned integer")))
            .transpose()
    }

    /// Returns all element children (text segments excluded).
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter(|child| child.name != TEXT_NODE)
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Returns children matching a `a|b|c` alternation, in document order.
    pub fn children_named<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| pattern.split('|').any(|name| name == child.name))
    }

    /// Collects `property name=... value=...` children into a map.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::MissingAttribute`] when a property lacks a name or value.
    pub fn children_as_properties(&self) -> Result<BTreeMap<String, String>, NodeError> {
        let mut properties = BTreeMap::new();
        for child in self.children_named(PROPERTY_NODE) {
            let name = child.require_attr("name")?;
            let value = child.require_attr("value")?;
            properties.insert(name.to_string(), value.to_string());
        }
        Ok(properties)
    }

    /// Returns mixed content: leading text followed by children in order.
    #[must_use]
    pub fn body_segments(&self) -> Vec<BodySegment<'_>> {
        let mut segments = Vec::with_capacity(self.children.len() + 1);
        if let Some(text) = &self.text {
            segments.push(BodySegment::Text(text));
        }
        for child in &self.children {
            if child.name == TEXT_NODE {
                segments.push(BodySegment::Text(child.text.as_deref().unwrap_or_default()));
            } else {
                segments.push(BodySegment::Element(child));
            }
        }
        segments
    }

    /// Returns the concatenated text of this node and all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Derives a positional identifier such as `association[author]`.
    #[must_use]
    pub fn value_based_identifier(&self) -> String {
        match self.first_attr(&["id", "value", "property"]) {
            Some(value) => format!("{}[{}]", self.name, value.replace('.', "_")),
            None => self.name.clone(),
        }
    }

    /// Replaces `${key}` placeholders in attributes and text, recursively.
    pub fn substitute_variables(&mut self, variables: &BTreeMap<String, String>) {
        if variables.is_empty() {
            return;
        }
        for value in self.attributes.values_mut() {
            *value = substitute_placeholders(value, variables);
        }
        if let Some(text) = &mut self.text {
            *text = substitute_placeholders(text, variables);
        }
        for child in &mut self.children {
            child.substitute_variables(variables);
        }
    }

    /// Builds an invalid-attribute error for this node.
    fn invalid(&self, attribute: &str, value: &str, expected: &'static str) -> NodeError {
        NodeError::InvalidAttribute {
            node: self.name.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends all text beneath `node` to `out`.
fn collect_text(node: &Node, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(text);
    }
    for child in &node.children {
        collect_text(child, out);
    }
}

/// Replaces `${key}` tokens with values from `variables`; unknown keys stay verbatim.
#[must_use]
pub fn substitute_placeholders(input: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[.. start]);
        let after = &rest[start + 2 ..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start ..]);
            return out;
        };
        let key = &after[.. end];
        match variables.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("${");
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[end + 1 ..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests;
