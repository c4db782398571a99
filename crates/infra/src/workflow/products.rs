use serde::Deserialize;

use orderflow_auth::ActingUser;
use orderflow_auth::classifier::{is_manager_sales, is_superuser};
use orderflow_core::{DomainError, TenantId, validate_company_code};
use orderflow_products::{Product, ProductStatus};

use super::{Receipt, WorkflowResult, WorkflowService, require_user};
use crate::store::WorkflowStore;

/// Input for a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub unit_price: u64,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

impl<S: WorkflowStore> WorkflowService<S> {
    /// Add a product to the tenant catalog (superuser or sales manager).
    pub fn register_product(
        &self,
        tenant_id: TenantId,
        user: Option<&ActingUser>,
        input: NewProduct,
    ) -> WorkflowResult<Receipt> {
        self.store().transact(|tx| -> WorkflowResult<Receipt> {
            let acting = require_user(user)?;
            if !(is_superuser(Some(acting)) || is_manager_sales(Some(acting))) {
                return Err(DomainError::forbidden("only managers can maintain the catalog").into());
            }
            let sku = input.sku.trim();
            let name = input.name.trim();
            if sku.is_empty() || name.is_empty() {
                return Err(DomainError::validation("sku and name are required").into());
            }
            if tx
                .list::<Product>(tenant_id)
                .iter()
                .any(|p| p.sku.eq_ignore_ascii_case(sku))
            {
                return Err(DomainError::conflict(format!("sku {sku} already exists")).into());
            }

            let id = tx.next_id::<Product>();
            tx.insert(Product {
                id,
                tenant_id,
                sku: sku.to_string(),
                name: name.to_string(),
                status: input.status.unwrap_or(ProductStatus::Active),
                unit_price: input.unit_price,
            })?;
            tracing::info!(tenant_id = %tenant_id, product_id = %id, sku, actor = %acting.id, "product registered");
            Ok(Receipt {
                id: id.into(),
                number: None,
            })
        })
    }

    pub fn list_products(
        &self,
        tenant_id: TenantId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<Vec<Product>> {
        require_user(user)?;
        Ok(self
            .store()
            .snapshot(|t| t.list::<Product>(tenant_id).into_iter().cloned().collect())?)
    }

    /// Register the company code used in the tenant's document numbers
    /// (superuser only).
    pub fn set_company_code(
        &self,
        tenant_id: TenantId,
        user: Option<&ActingUser>,
        code: &str,
    ) -> WorkflowResult<()> {
        self.store().transact(|tx| -> WorkflowResult<()> {
            let acting = require_user(user)?;
            if !is_superuser(Some(acting)) {
                return Err(DomainError::forbidden("only a superuser can change the company code").into());
            }
            let code = code.trim();
            validate_company_code(code)?;
            tx.set_company_code(tenant_id, code);
            tracing::info!(tenant_id = %tenant_id, company_code = code, actor = %acting.id, "company code set");
            Ok(())
        })
    }
}
