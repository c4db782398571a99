use serde::{Deserialize, Serialize};

use orderflow_core::{Entity, TenantId, record_id_newtype};

record_id_newtype!(
    /// Product identifier.
    ProductId,
    "ProductId"
);

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// Catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub status: ProductStatus,
    /// Current list price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl Product {
    /// Check if product can be sold (must be Active, not Draft or Archived).
    pub fn can_be_sold(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Case-insensitive, whitespace-trimmed name comparison.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Name lookup over a set of products.
pub trait ProductCatalog {
    /// First sellable product whose name matches `name`.
    fn find_sellable_by_name(&self, name: &str) -> Option<&Product>;
}

impl ProductCatalog for [Product] {
    fn find_sellable_by_name(&self, name: &str) -> Option<&Product> {
        self.iter().find(|p| p.can_be_sold() && p.name_matches(name))
    }
}

impl ProductCatalog for Vec<Product> {
    fn find_sellable_by_name(&self, name: &str) -> Option<&Product> {
        self.as_slice().find_sellable_by_name(name)
    }
}
