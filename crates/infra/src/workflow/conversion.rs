//! Conversion Pipeline.
//!
//! Lead/Opportunity → Quotation → Sales Order → Purchase Order. Each step
//! creates the downstream record and stamps the upstream one in the same
//! transaction.

use chrono::Utc;
use serde::Serialize;

use orderflow_auth::classifier::{is_purchasing, is_sales, is_superuser};
use orderflow_auth::{ActingUser, check_ownership};
use orderflow_core::{Aggregate, CustomerId, DocumentPrefix, DomainError, RecordId, TenantId, VendorId};
use orderflow_crm::{
    Lead, LeadId, Quotation, QuotationId, QuotationItem, QuotationStage, QuotationStatus,
    can_convert_opportunity_to_sq,
};
use orderflow_products::{Product, ProductCatalog};
use orderflow_purchasing::PurchaseOrder;
use orderflow_sales::{
    NewOrderItem, NewSalesOrder, OrderAction, PerformAction, SaleStatus, SalesOrder,
    SalesOrderCommand, SalesOrderId, compute_permissions,
};

use super::{WorkflowResult, WorkflowService, hide_missing, log_denied, require_user};
use crate::numbering;
use crate::store::WorkflowStore;

/// Identity of a created record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: RecordId,
    /// Generated document number, for numbered documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

impl<S: WorkflowStore> WorkflowService<S> {
    /// Turn an opportunity into a draft quotation.
    ///
    /// Products named in the lead's `product_interest` are priced from the
    /// catalog at quantity 1; names without a sellable match are dropped.
    pub fn convert_lead_to_quotation(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        user: Option<&ActingUser>,
        customer_id: Option<CustomerId>,
    ) -> WorkflowResult<Receipt> {
        let result = self.store().transact(|tx| -> WorkflowResult<Receipt> {
            let acting = require_user(user)?;
            let mut lead = tx.load::<Lead>(tenant_id, lead_id).map_err(hide_missing)?;
            can_convert_opportunity_to_sq(&lead, Some(acting))?;

            let customer_id = customer_id.or(lead.customer_id).ok_or_else(|| {
                DomainError::validation("a customer is required to create a quotation")
            })?;

            let catalog = tx.list::<Product>(tenant_id);
            let items: Vec<QuotationItem> = lead
                .product_interest_names()
                .into_iter()
                .filter_map(|name| match catalog.find_sellable_by_name(name) {
                    Some(product) => Some(QuotationItem {
                        product_id: product.id,
                        description: product.name.clone(),
                        quantity: 1,
                        unit_price: product.unit_price,
                    }),
                    None => {
                        tracing::debug!(lead_id = %lead_id, product = name, "no sellable product matches interest");
                        None
                    }
                })
                .collect();

            let now = Utc::now();
            let id = tx.next_id::<Quotation>();
            let number = numbering::allocate(
                tx,
                tenant_id,
                DocumentPrefix::Quotation,
                self.default_company_code(),
                now,
            )?;
            let quotation = Quotation {
                id,
                tenant_id,
                number: number.clone(),
                owner_id: acting.id,
                lead_id: Some(lead_id),
                customer_id,
                status: QuotationStatus::Draft,
                stage: QuotationStage::Draft,
                items,
                created_at: now,
                updated_at: now,
            };
            tx.insert(quotation)?;

            lead.mark_converted(now);
            tx.update(lead)?;

            tracing::info!(
                tenant_id = %tenant_id,
                lead_id = %lead_id,
                quotation_id = %id,
                number = %number,
                actor = %acting.id,
                "opportunity converted to quotation"
            );
            Ok(Receipt {
                id: id.into(),
                number: Some(number),
            })
        });
        if let Err(err) = &result {
            log_denied("convert_lead_to_quotation", lead_id.into(), user, err);
        }
        result
    }

    /// Turn an accepted quotation into a NEW sales order owned by the caller.
    pub fn convert_quotation_to_sales_order(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<Receipt> {
        let result = self.store().transact(|tx| -> WorkflowResult<Receipt> {
            let acting = require_user(user)?;
            let mut quotation = tx
                .load::<Quotation>(tenant_id, quotation_id)
                .map_err(hide_missing)?;
            check_ownership(&quotation, Some(acting))?;
            if !is_sales(Some(acting)) {
                return Err(DomainError::forbidden("only sales can create sales orders").into());
            }
            quotation.ensure_convertible_to_sales_order()?;

            let now = Utc::now();
            let id = tx.next_id::<SalesOrder>();
            let number = numbering::allocate(
                tx,
                tenant_id,
                DocumentPrefix::SalesOrder,
                self.default_company_code(),
                now,
            )?;
            let order = SalesOrder::open(NewSalesOrder {
                id,
                tenant_id,
                number: number.clone(),
                owner_id: acting.id,
                customer_id: quotation.customer_id,
                quotation_id: Some(quotation_id),
                items: quotation
                    .items
                    .iter()
                    .map(|item| NewOrderItem {
                        product_id: item.product_id,
                        description: item.description.clone(),
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                    })
                    .collect(),
                created_at: now,
            });
            tx.insert(order)?;

            quotation.mark_converted(now);
            tx.update(quotation)?;

            tracing::info!(
                tenant_id = %tenant_id,
                quotation_id = %quotation_id,
                sales_order_id = %id,
                number = %number,
                actor = %acting.id,
                "quotation converted to sales order"
            );
            Ok(Receipt {
                id: id.into(),
                number: Some(number),
            })
        });
        if let Err(err) = &result {
            log_denied("convert_quotation_to_sales_order", quotation_id.into(), user, err);
        }
        result
    }

    /// Raise a purchase order for a sales order.
    ///
    /// From PR the order advances to PO through the permission engine. A
    /// superuser may also raise a supplemental purchase order while the sales
    /// order is anywhere from PO to DR; the sales order status is then left
    /// alone.
    pub fn create_purchase_order_from_sales_order(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        vendor_id: Option<VendorId>,
        note: Option<String>,
    ) -> WorkflowResult<Receipt> {
        let result = self.store().transact(|tx| -> WorkflowResult<Receipt> {
            let acting = require_user(user)?;
            let mut order = tx
                .load::<SalesOrder>(tenant_id, order_id)
                .map_err(hide_missing)?;
            check_ownership(&order, Some(acting))?;
            if !is_purchasing(Some(acting)) {
                return Err(DomainError::forbidden("only purchasing can create purchase orders").into());
            }

            let now = Utc::now();
            let status = order.sale_status();
            let supplemental = match status {
                SaleStatus::Pr => {
                    let grant = compute_permissions(&order, Some(acting));
                    order.execute(
                        &SalesOrderCommand::PerformAction(PerformAction {
                            actor: acting.id,
                            action: OrderAction::UpdateStatusPo,
                            comment: note.clone(),
                            occurred_at: now,
                        }),
                        &grant,
                    )?;
                    tx.update(order.clone())?;
                    false
                }
                SaleStatus::Po | SaleStatus::Sr | SaleStatus::Far | SaleStatus::Dr
                    if is_superuser(Some(acting)) =>
                {
                    true
                }
                other => {
                    return Err(DomainError::precondition(format!(
                        "sales order must be in PR status to create a purchase order (status is {other})"
                    ))
                    .into());
                }
            };

            let id = tx.next_id::<PurchaseOrder>();
            let number = numbering::allocate(
                tx,
                tenant_id,
                DocumentPrefix::PurchaseOrder,
                self.default_company_code(),
                now,
            )?;
            let purchase_order = PurchaseOrder::for_sales_order(
                id,
                number.clone(),
                &order,
                vendor_id,
                acting.id,
                note,
                supplemental,
                now,
            )?;
            tx.insert(purchase_order)?;

            tracing::info!(
                tenant_id = %tenant_id,
                sales_order_id = %order_id,
                purchase_order_id = %id,
                number = %number,
                supplemental,
                actor = %acting.id,
                "purchase order created"
            );
            Ok(Receipt {
                id: id.into(),
                number: Some(number),
            })
        });
        if let Err(err) = &result {
            log_denied("create_purchase_order_from_sales_order", order_id.into(), user, err);
        }
        result
    }
}
