// crates/rowbind-config/src/database_id.rs
// ============================================================================
// Module: Rowbind Vendor Database Id
// Description: Database id provider keyed on the data source product name.
// Purpose: Select database-specific statements from declared data sources.
// Dependencies: rowbind-core
// ============================================================================

//! ## Overview
//! The vendor provider derives a product name from the data source
//! declaration (`productName` property, else the `jdbc:<product>:` prefix of
//! `url`). With no properties the product name is the database id; otherwise
//! the first property key contained in the product name selects its value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rowbind_core::DataSourceSpec;
use rowbind_core::DatabaseId;
use rowbind_core::DatabaseIdError;
use rowbind_core::DatabaseIdProvider;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registry name of the vendor provider.
pub const VENDOR_PROVIDER: &str = "DB_VENDOR";

/// Short alias accepted for [`VENDOR_PROVIDER`].
pub const VENDOR_ALIAS: &str = "VENDOR";

// ============================================================================
// SECTION: Vendor Provider
// ============================================================================

/// Database id provider matching on the data source product name.
#[derive(Debug, Clone, Default)]
pub struct VendorDatabaseIdProvider {
    /// Product-name fragment to database id.
    properties: BTreeMap<String, String>,
}

impl VendorDatabaseIdProvider {
    /// Creates a provider with no product mappings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatabaseIdProvider for VendorDatabaseIdProvider {
    fn set_properties(&mut self, properties: BTreeMap<String, String>) {
        self.properties = properties;
    }

    fn database_id(&self, data_source: &DataSourceSpec) -> Result<Option<DatabaseId>, DatabaseIdError> {
        let product = product_name(data_source).ok_or_else(|| {
            DatabaseIdError::Provider(format!(
                "cannot determine database product name for data source type {}",
                data_source.kind
            ))
        })?;
        if self.properties.is_empty() {
            return Ok(Some(DatabaseId::new(product)));
        }
        Ok(self
            .properties
            .iter()
            .find(|(fragment, _)| product.contains(fragment.as_str()))
            .map(|(_, id)| DatabaseId::new(id.clone())))
    }
}

/// Reads the product name from a data source declaration.
fn product_name(data_source: &DataSourceSpec) -> Option<String> {
    if let Some(name) = data_source.properties.get("productName") {
        return Some(name.clone());
    }
    let url = data_source.properties.get("url")?;
    let product = url.strip_prefix("jdbc:")?.split(':').next()?;
    (!product.is_empty()).then(|| product.to_string())
}

#[cfg(test)]
mod tests;
