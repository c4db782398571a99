use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_auth::classifier::is_purchasing;
use orderflow_auth::{ActingUser, check_ownership};
use orderflow_core::{DomainError, DomainResult, Entity, TenantId, UserId, VendorId, record_id_newtype};
use orderflow_products::ProductId;
use orderflow_sales::{ItemStatus, SalesOrder, SalesOrderId};

record_id_newtype!(
    /// Purchase order identifier.
    PurchaseOrderId,
    "PurchaseOrderId"
);

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Ordered,
    Received,
    Cancelled,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i64,
    /// Vendor cost, unknown until purchasing fills it in.
    pub unit_cost: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub tenant_id: TenantId,
    pub number: String,
    pub sales_order_id: SalesOrderId,
    pub vendor_id: Option<VendorId>,
    pub created_by: UserId,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<PurchaseOrderLine>,
    pub note: Option<String>,
    /// Raised after the sales order had already moved past PR.
    pub supplemental: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Build a purchase order for every line of `order` that still needs goods.
    #[allow(clippy::too_many_arguments)]
    pub fn for_sales_order(
        id: PurchaseOrderId,
        number: String,
        order: &SalesOrder,
        vendor_id: Option<VendorId>,
        created_by: UserId,
        note: Option<String>,
        supplemental: bool,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let lines: Vec<PurchaseOrderLine> = order
            .items()
            .iter()
            .filter(|item| item.status != ItemStatus::Cancelled)
            .enumerate()
            .map(|(idx, item)| PurchaseOrderLine {
                line_no: idx as u32 + 1,
                product_id: item.product_id,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_cost: None,
            })
            .collect();
        if lines.is_empty() {
            return Err(DomainError::validation("sales order has no open lines to purchase"));
        }

        Ok(Self {
            id,
            tenant_id: order.tenant_id(),
            number,
            sales_order_id: order.id_typed(),
            vendor_id,
            created_by,
            status: PurchaseOrderStatus::Ordered,
            lines,
            note,
            supplemental,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn mark_received(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.leave_ordered(PurchaseOrderStatus::Received, at)
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.leave_ordered(PurchaseOrderStatus::Cancelled, at)
    }

    fn leave_ordered(&mut self, next: PurchaseOrderStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Ordered {
            return Err(DomainError::precondition(format!(
                "purchase order is already {:?}",
                self.status
            )));
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> PurchaseOrderId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Purchase orders are visible to the purchasing department and to whoever
/// may see the sales order they were raised for.
///
/// `sales_order` is `None` when the referenced order no longer resolves.
pub fn check_purchase_order_access(
    sales_order: Option<&SalesOrder>,
    user: Option<&ActingUser>,
) -> DomainResult<()> {
    let acting = user.ok_or(DomainError::Unauthorized)?;
    if is_purchasing(user) {
        return Ok(());
    }
    match sales_order {
        Some(order) => check_ownership(order, Some(acting)),
        None => {
            tracing::debug!(user_id = %acting.id, "purchase order hidden: sales order not visible");
            Err(DomainError::NotFound)
        }
    }
}
