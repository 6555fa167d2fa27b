// crates/rowbind-config/src/builder/tests.rs
// ============================================================================
// Module: Configuration Builder Tests
// Description: Unit tests for global configuration sections.
// Purpose: Confirm section order, guards, and provider and plugin wiring.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! Drives [`super::ConfigBuilder`] with in-memory documents.

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
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use rowbind_core::DatabaseId;
use rowbind_core::ExtensionError;
use rowbind_core::InMemorySource;
use rowbind_core::Interceptor;
use rowbind_core::Invocation;
use rowbind_core::MapperReference;
use rowbind_core::Node;
use rowbind_core::Outcome;
use rowbind_core::PluginError;
use rowbind_core::Signature;
use rowbind_core::SqlSegment;
use rowbind_core::TypeName;

use super::ConfigBuilder;
use crate::configuration::Configuration;
use crate::error::ConfigError;
use crate::error::MappingError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Interceptor whose intercepted method comes from its properties.
#[derive(Default)]
struct Configured {
    method: Option<String>,
}

impl Interceptor for Configured {
    fn intercept(&self, invocation: Invocation<'_>) -> Result<Outcome, ExtensionError> {
        invocation.proceed()
    }

    fn signatures(&self) -> Vec<Signature> {
        self.method.iter().map(|method| Signature::new("Executor", method.as_str(), &["bool"])).collect()
    }

    fn set_properties(&mut self, properties: &BTreeMap<String, String>) -> Result<(), PluginError> {
        let method = properties.get("method").ok_or_else(|| PluginError::Properties {
            interceptor: "configured".to_string(),
            message: "method is required".to_string(),
        })?;
        self.method = Some(method.clone());
        Ok(())
    }
}

/// Interceptor counting how often its signatures are requested.
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl Interceptor for Counting {
    fn intercept(&self, invocation: Invocation<'_>) -> Result<Outcome, ExtensionError> {
        invocation.proceed()
    }

    fn signatures(&self) -> Vec<Signature> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        vec![Signature::new("Executor", "commit", &["bool"])]
    }
}

fn property(name: &str, value: &str) -> Node {
    Node::new("property").with_attr("name", name).with_attr("value", value)
}

fn setting(name: &str, value: &str) -> Node {
    Node::new("setting").with_attr("name", name).with_attr("value", value)
}

fn environment(id: &str, url: &str) -> Node {
    Node::new("environment")
        .with_attr("id", id)
        .with_child(Node::new("transactionManager").with_attr("type", "JDBC"))
        .with_child(Node::new("dataSource").with_attr("type", "POOLED").with_child(property("url", url)))
}

fn environments() -> Node {
    Node::new("environments")
        .with_attr("default", "dev")
        .with_child(environment("dev", "jdbc:postgresql://localhost/blog"))
        .with_child(environment("test", "jdbc:h2:mem:blog"))
}

fn vendor_provider() -> Node {
    Node::new("databaseIdProvider").with_attr("type", "VENDOR").with_child(property("postgresql", "pg"))
}

fn mappers(resource: &str) -> Node {
    Node::new("mappers").with_child(Node::new("mapper").with_attr("resource", resource))
}

fn blog_unit() -> Node {
    Node::new("mapper")
        .with_attr("namespace", "blog")
        .with_child(Node::new("select").with_attr("id", "all").with_attr("databaseId", "pg").with_text("select pg"))
        .with_child(Node::new("select").with_attr("id", "all").with_text("select ${table}"))
}

fn configuration() -> Node {
    Node::new("configuration")
}

fn statement_text(config: &Configuration, id: &str) -> String {
    match &config.statement(id).unwrap().unwrap().sql.segments[..] {
        [SqlSegment::Text(text)] => text.clone(),
        _ => panic!("expected a single text segment"),
    }
}

// ============================================================================
// SECTION: Full Documents
// ============================================================================

#[test]
fn sections_are_applied_and_units_loaded() {
    let source = InMemorySource::new().with_resource("blog.toml", blog_unit());
    let root = configuration()
        .with_child(Node::new("properties").with_child(property("table", "posts")))
        .with_child(Node::new("settings").with_child(setting("cacheEnabled", "false")))
        .with_child(
            Node::new("typeAliases").with_child(Node::new("typeAlias").with_attr("type", "app.Blog").with_attr("alias", "Blog")),
        )
        .with_child(
            Node::new("plugins").with_child(
                Node::new("plugin").with_attr("interceptor", "configured").with_child(property("method", "commit")),
            ),
        )
        .with_child(environments())
        .with_child(vendor_provider())
        .with_child(mappers("blog.toml"));

    let mut builder =
        ConfigBuilder::new(source).register_interceptor("configured", || Box::new(Configured::default()));
    let config = builder.parse(&root).unwrap();

    assert!(!config.settings().cache_enabled);
    assert_eq!(config.aliases().lookup("blog"), Some(&TypeName::new("app.Blog")));
    assert_eq!(config.interceptors().len(), 1);
    assert_eq!(config.environment().unwrap().id, "dev");
    assert_eq!(config.database_id(), Some(&DatabaseId::new("pg")));
    assert_eq!(config.variables().get("table").map(String::as_str), Some("posts"));
    assert_eq!(statement_text(&config, "blog.all"), "select pg");
}

#[test]
fn builder_overrides_environment_and_variables() {
    let source = InMemorySource::new().with_resource("blog.toml", blog_unit());
    let root = configuration()
        .with_child(Node::new("properties").with_child(property("table", "posts")))
        .with_child(environments())
        .with_child(vendor_provider())
        .with_child(mappers("blog.toml"));

    let mut builder = ConfigBuilder::new(source).with_environment("test").with_variable("table", "drafts");
    let config = builder.parse(&root).unwrap();

    assert_eq!(config.environment().unwrap().id, "test");
    assert_eq!(config.database_id(), None);
    assert_eq!(statement_text(&config, "blog.all"), "select drafts");
}

#[test]
fn fixed_database_id_wins_over_the_provider() {
    let source = InMemorySource::new().with_resource("blog.toml", blog_unit());
    let root = configuration().with_child(environments()).with_child(vendor_provider()).with_child(mappers("blog.toml"));

    let mut builder = ConfigBuilder::new(source).with_database_id(DatabaseId::new("mysql"));
    let config = builder.parse(&root).unwrap();

    assert_eq!(config.database_id(), Some(&DatabaseId::new("mysql")));
    assert_eq!(statement_text(&config, "blog.all"), "select ${table}");
}

#[test]
fn property_document_overrides_inline_properties() {
    let mut source = InMemorySource::new();
    source.insert_properties(
        MapperReference::Resource("db.properties".to_string()),
        BTreeMap::from([("table".to_string(), "archive".to_string())]),
    );
    let root = configuration().with_child(
        Node::new("properties")
            .with_attr("resource", "db.properties")
            .with_child(property("table", "posts"))
            .with_child(property("schema", "main")),
    );

    let config = ConfigBuilder::new(source).parse(&root).unwrap();

    assert_eq!(config.variables().get("table").map(String::as_str), Some("archive"));
    assert_eq!(config.variables().get("schema").map(String::as_str), Some("main"));
}

#[test]
fn packages_load_every_mapper_type() {
    let mut source = InMemorySource::new();
    source.insert(
        MapperReference::Type(TypeName::new("app.mappers.BlogMapper")),
        Node::new("mapper").with_attr("namespace", "blog").with_child(Node::new("select").with_attr("id", "a")),
    );
    source.insert(
        MapperReference::Type(TypeName::new("app.mappers.AuthorMapper")),
        Node::new("mapper").with_attr("namespace", "author").with_child(Node::new("select").with_attr("id", "a")),
    );
    let root = configuration()
        .with_child(Node::new("typeAliases").with_child(Node::new("package").with_attr("name", "app.mappers")))
        .with_child(Node::new("mappers").with_child(Node::new("package").with_attr("name", "app.mappers")));

    let config = ConfigBuilder::new(source).parse(&root).unwrap();

    assert_eq!(config.loaded_units().len(), 2);
    assert_eq!(config.statements().len(), 2);
    assert_eq!(config.aliases().lookup("blogmapper"), Some(&TypeName::new("app.mappers.BlogMapper")));
}

#[test]
fn declared_records_validate_shapes() {
    let unit = Node::new("mapper").with_attr("namespace", "blog").with_child(
        Node::new("resultMap").with_attr("id", "blogMap").with_attr("type", "Blog").with_child(
            Node::new("result").with_attr("property", "subtitle").with_attr("column", "subtitle"),
        ),
    );
    let source = InMemorySource::new().with_resource("blog.toml", unit);
    let root = configuration()
        .with_child(
            Node::new("schemas").with_child(
                Node::new("record")
                    .with_attr("name", "Blog")
                    .with_child(Node::new("field").with_attr("name", "title").with_attr("type", "string")),
            ),
        )
        .with_child(mappers("blog.toml"));

    let err = ConfigBuilder::new(source).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::Mapping { source: MappingError::Schema(_), .. }));
}

#[test]
fn converters_are_registered() {
    let root = configuration().with_child(
        Node::new("typeHandlers").with_child(
            Node::new("typeHandler")
                .with_attr("handler", "app.MoneyHandler")
                .with_attr("javaType", "app.Money")
                .with_attr("jdbcType", "NUMERIC"),
        ),
    );

    let config = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap();

    assert_eq!(config.converters().len(), 1);
    assert_eq!(config.converters()[0].handler.as_str(), "app.MoneyHandler");
    assert_eq!(config.converters()[0].java_type, Some(TypeName::new("app.Money")));
}

// ============================================================================
// SECTION: Guards
// ============================================================================

#[test]
fn builder_parses_only_once() {
    let mut builder = ConfigBuilder::new(InMemorySource::new());
    builder.parse(&configuration()).unwrap();

    let err = builder.parse(&configuration()).unwrap_err();

    assert!(matches!(err, ConfigError::AlreadyParsed));
}

#[test]
fn root_element_must_be_configuration() {
    let err = ConfigBuilder::new(InMemorySource::new()).parse(&Node::new("mapper")).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn unknown_setting_is_fatal() {
    let root = configuration().with_child(Node::new("settings").with_child(setting("cacheEnabeld", "true")));

    let err = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::UnknownSetting { key } if key == "cacheEnabeld"));
}

#[test]
fn mapper_must_name_exactly_one_source() {
    let root = configuration().with_child(
        Node::new("mappers")
            .with_child(Node::new("mapper").with_attr("resource", "blog.toml").with_attr("class", "app.BlogMapper")),
    );

    let err = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::MapperReference));
}

#[test]
fn properties_cannot_name_resource_and_url() {
    let root = configuration().with_child(
        Node::new("properties").with_attr("resource", "a.properties").with_attr("url", "file:///b.properties"),
    );

    let err = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::PropertiesReference));
}

#[test]
fn unregistered_interceptor_is_fatal() {
    let root = configuration()
        .with_child(Node::new("plugins").with_child(Node::new("plugin").with_attr("interceptor", "missing")));

    let err = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::UnknownInterceptor { name } if name == "missing"));
}

#[test]
fn interceptor_signatures_are_resolved_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let root = configuration().with_child(
        Node::new("plugins").with_child(
            Node::new("plugin").with_attr("interceptor", "counting").with_child(
                Node::new("signature").with_attr("type", "Executor").with_attr("method", "rollback").with_attr("args", "bool"),
            ),
        ),
    );
    let factory_calls = Arc::clone(&calls);

    let config = ConfigBuilder::new(InMemorySource::new())
        .register_interceptor("counting", move || {
            Box::new(Counting {
                calls: Arc::clone(&factory_calls),
            })
        })
        .parse(&root)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let plugin = config.interceptors().plugins().next().unwrap();
    assert_eq!(plugin.methods().count(), 2);
}

#[test]
fn interceptor_property_rejection_is_fatal() {
    let root = configuration()
        .with_child(Node::new("plugins").with_child(Node::new("plugin").with_attr("interceptor", "configured")));

    let err = ConfigBuilder::new(InMemorySource::new())
        .register_interceptor("configured", || Box::new(Configured::default()))
        .parse(&root)
        .unwrap_err();

    assert!(matches!(err, ConfigError::Plugin(PluginError::Properties { .. })));
}

#[test]
fn environment_requires_a_data_source() {
    let root = configuration().with_child(
        Node::new("environments").with_attr("default", "dev").with_child(
            Node::new("environment")
                .with_attr("id", "dev")
                .with_child(Node::new("transactionManager").with_attr("type", "JDBC")),
        ),
    );

    let err = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::Environment(message) if message.contains("dataSource")));
}

#[test]
fn unknown_database_id_provider_is_fatal() {
    let root = configuration().with_child(Node::new("databaseIdProvider").with_attr("type", "ORACLE_ONLY"));

    let err = ConfigBuilder::new(InMemorySource::new()).parse(&root).unwrap_err();

    assert!(matches!(err, ConfigError::UnknownDatabaseIdProvider { name } if name == "ORACLE_ONLY"));
}

#[test]
fn dangling_reference_after_all_units_is_fatal() {
    let unit = Node::new("mapper")
        .with_attr("namespace", "blog")
        .with_child(Node::new("select").with_attr("id", "a").with_attr("resultMap", "authors.authorMap"));
    let source = InMemorySource::new().with_resource("blog.toml", unit);

    let err = ConfigBuilder::new(source).parse(&configuration().with_child(mappers("blog.toml"))).unwrap_err();

    assert!(matches!(err, ConfigError::Unresolved { items } if items.len() == 1));
}

#[test]
fn missing_unit_is_a_source_error() {
    let err = ConfigBuilder::new(InMemorySource::new())
        .parse(&configuration().with_child(mappers("nowhere.toml")))
        .unwrap_err();

    assert!(matches!(err, ConfigError::Source(_)));
}
