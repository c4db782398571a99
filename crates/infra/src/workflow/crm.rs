use chrono::Utc;
use serde::Deserialize;

use orderflow_auth::classifier::{is_purchasing, is_sales};
use orderflow_auth::{ActingUser, check_ownership};
use orderflow_core::{CustomerId, DomainError, TenantId, UserId};
use orderflow_crm::{Lead, LeadId, LeadStatus, Quotation, QuotationId, QuotationStage, QuotationStatus};
use orderflow_purchasing::{
    PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus, check_purchase_order_access,
};
use orderflow_sales::SalesOrder;

use super::{Receipt, WorkflowResult, WorkflowService, hide_missing, log_denied, require_user};
use crate::store::WorkflowStore;

/// Input for a new lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewLead {
    pub name: String,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub product_interest: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
}

/// Status and/or stage change on a quotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuotationStatusUpdate {
    #[serde(default)]
    pub status: Option<QuotationStatus>,
    #[serde(default)]
    pub stage: Option<QuotationStage>,
}

impl<S: WorkflowStore> WorkflowService<S> {
    /// Create a lead owned by the calling sales user.
    pub fn create_lead(
        &self,
        tenant_id: TenantId,
        user: Option<&ActingUser>,
        input: NewLead,
    ) -> WorkflowResult<Receipt> {
        self.store().transact(|tx| -> WorkflowResult<Receipt> {
            let acting = require_user(user)?;
            if !is_sales(Some(acting)) {
                return Err(DomainError::forbidden("only sales can create leads").into());
            }
            let name = input.name.trim();
            if name.is_empty() {
                return Err(DomainError::validation("lead name is required").into());
            }
            let status = input.status.unwrap_or(LeadStatus::LeadNew);
            if status == LeadStatus::OppSq || status.is_closed() {
                return Err(DomainError::validation(format!("a lead cannot start as {status}")).into());
            }

            let now = Utc::now();
            let id = tx.next_id::<Lead>();
            tx.insert(Lead {
                id,
                tenant_id,
                name: name.to_string(),
                owner_id: acting.id,
                assigned_to: input.assigned_to,
                customer_id: input.customer_id,
                status,
                product_interest: input.product_interest,
                created_at: now,
                updated_at: now,
            })?;

            tracing::info!(tenant_id = %tenant_id, lead_id = %id, actor = %acting.id, "lead created");
            Ok(Receipt {
                id: id.into(),
                number: None,
            })
        })
    }

    pub fn get_lead(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<Lead> {
        let acting = require_user(user)?;
        let lead = self
            .store()
            .snapshot(|t| t.find::<Lead>(tenant_id, lead_id).cloned())?
            .ok_or(DomainError::NotFound)?;
        check_ownership(&lead, Some(acting))?;
        Ok(lead)
    }

    pub fn update_lead_status(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        user: Option<&ActingUser>,
        status: LeadStatus,
    ) -> WorkflowResult<Lead> {
        let result = self.store().transact(|tx| -> WorkflowResult<Lead> {
            let acting = require_user(user)?;
            let mut lead = tx.load::<Lead>(tenant_id, lead_id).map_err(hide_missing)?;
            check_ownership(&lead, Some(acting))?;
            let from = lead.status;
            lead.change_status(status, Utc::now())?;
            tx.update(lead.clone())?;
            tracing::info!(
                tenant_id = %tenant_id,
                lead_id = %lead_id,
                from = %from,
                to = %status,
                actor = %acting.id,
                "lead status changed"
            );
            Ok(lead)
        });
        if let Err(err) = &result {
            log_denied("update_lead_status", lead_id.into(), user, err);
        }
        result
    }

    pub fn get_quotation(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<Quotation> {
        let acting = require_user(user)?;
        let quotation = self
            .store()
            .snapshot(|t| t.find::<Quotation>(tenant_id, quotation_id).cloned())?
            .ok_or(DomainError::NotFound)?;
        check_ownership(&quotation, Some(acting))?;
        Ok(quotation)
    }

    pub fn update_quotation_status(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        user: Option<&ActingUser>,
        update: QuotationStatusUpdate,
    ) -> WorkflowResult<Quotation> {
        let result = self.store().transact(|tx| -> WorkflowResult<Quotation> {
            let acting = require_user(user)?;
            let mut quotation = tx
                .load::<Quotation>(tenant_id, quotation_id)
                .map_err(hide_missing)?;
            check_ownership(&quotation, Some(acting))?;
            if update.status.is_none() && update.stage.is_none() {
                return Err(DomainError::validation("nothing to update").into());
            }

            let now = Utc::now();
            if let Some(status) = update.status {
                quotation.change_status(status, now)?;
            }
            if let Some(stage) = update.stage {
                quotation.change_stage(stage, now)?;
            }
            tx.update(quotation.clone())?;
            tracing::info!(
                tenant_id = %tenant_id,
                quotation_id = %quotation_id,
                status = %quotation.status,
                stage = ?quotation.stage,
                actor = %acting.id,
                "quotation updated"
            );
            Ok(quotation)
        });
        if let Err(err) = &result {
            log_denied("update_quotation_status", quotation_id.into(), user, err);
        }
        result
    }

    pub fn get_purchase_order(
        &self,
        tenant_id: TenantId,
        purchase_order_id: PurchaseOrderId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<PurchaseOrder> {
        require_user(user)?;
        let (purchase_order, sales_order) = self
            .store()
            .snapshot(|t| {
                t.find::<PurchaseOrder>(tenant_id, purchase_order_id)
                    .cloned()
                    .map(|po| {
                        let so = t.find::<SalesOrder>(tenant_id, po.sales_order_id).cloned();
                        (po, so)
                    })
            })?
            .ok_or(DomainError::NotFound)?;
        check_purchase_order_access(sales_order.as_ref(), user)?;
        Ok(purchase_order)
    }

    /// Mark a purchase order received or cancelled (purchasing only).
    pub fn update_purchase_order_status(
        &self,
        tenant_id: TenantId,
        purchase_order_id: PurchaseOrderId,
        user: Option<&ActingUser>,
        status: PurchaseOrderStatus,
    ) -> WorkflowResult<PurchaseOrder> {
        let result = self.store().transact(|tx| -> WorkflowResult<PurchaseOrder> {
            let acting = require_user(user)?;
            let mut purchase_order = tx
                .load::<PurchaseOrder>(tenant_id, purchase_order_id)
                .map_err(hide_missing)?;
            let sales_order = tx.find::<SalesOrder>(tenant_id, purchase_order.sales_order_id);
            check_purchase_order_access(sales_order.as_ref(), Some(acting))?;
            if !is_purchasing(Some(acting)) {
                return Err(DomainError::forbidden("only purchasing can update purchase orders").into());
            }

            let now = Utc::now();
            match status {
                PurchaseOrderStatus::Received => purchase_order.mark_received(now)?,
                PurchaseOrderStatus::Cancelled => purchase_order.cancel(now)?,
                PurchaseOrderStatus::Ordered => {
                    return Err(DomainError::validation("a purchase order cannot go back to ordered").into());
                }
            }
            tx.update(purchase_order.clone())?;
            tracing::info!(
                tenant_id = %tenant_id,
                purchase_order_id = %purchase_order_id,
                status = ?status,
                actor = %acting.id,
                "purchase order updated"
            );
            Ok(purchase_order)
        });
        if let Err(err) = &result {
            log_denied("update_purchase_order_status", purchase_order_id.into(), user, err);
        }
        result
    }
}
