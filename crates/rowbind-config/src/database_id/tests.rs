// crates/rowbind-config/src/database_id/tests.rs
// ============================================================================
// Module: Vendor Database Id Tests
// Description: Unit tests for product-name based database ids.
// Purpose: Confirm product detection and property matching.
// Dependencies: rowbind-core
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::BTreeMap;

use rowbind_core::DataSourceSpec;
use rowbind_core::DatabaseId;
use rowbind_core::DatabaseIdProvider;

use super::VendorDatabaseIdProvider;

fn data_source(key: &str, value: &str) -> DataSourceSpec {
    DataSourceSpec {
        kind: "POOLED".to_string(),
        properties: BTreeMap::from([(key.to_string(), value.to_string())]),
    }
}

#[test]
fn product_name_is_the_id_without_properties() {
    let provider = VendorDatabaseIdProvider::new();
    let id = provider.database_id(&data_source("productName", "PostgreSQL")).unwrap();
    assert_eq!(id, Some(DatabaseId::new("PostgreSQL")));
}

#[test]
fn product_is_read_from_jdbc_url() {
    let provider = VendorDatabaseIdProvider::new();
    let id = provider.database_id(&data_source("url", "jdbc:mysql://localhost/blog")).unwrap();
    assert_eq!(id, Some(DatabaseId::new("mysql")));
}

#[test]
fn properties_map_product_fragments_to_ids() {
    let mut provider = VendorDatabaseIdProvider::new();
    provider.set_properties(BTreeMap::from([
        ("Oracle".to_string(), "oracle".to_string()),
        ("PostgreSQL".to_string(), "pg".to_string()),
    ]));
    let id = provider.database_id(&data_source("productName", "PostgreSQL 16.2")).unwrap();
    assert_eq!(id, Some(DatabaseId::new("pg")));
    let none = provider.database_id(&data_source("productName", "SQLite")).unwrap();
    assert_eq!(none, None);
}

#[test]
fn unknown_product_is_an_error() {
    let provider = VendorDatabaseIdProvider::new();
    assert!(provider.database_id(&data_source("driver", "org.h2.Driver")).is_err());
}
