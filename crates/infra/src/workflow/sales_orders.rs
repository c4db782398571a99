use chrono::{DateTime, Utc};

use orderflow_auth::{ActingUser, can_access, check_ownership};
use orderflow_core::{Aggregate, DomainError, Event, TenantId, UserId};
use orderflow_sales::{
    EditOrder, OrderAction, PerformAction, Permissions, RecordDelivery, RecordPayment,
    RequestReopen, ResolveReopen, SalesOrder, SalesOrderCommand, SalesOrderId, SalesOrderPatch,
    compute_permissions,
};

use super::{WorkflowResult, WorkflowService, hide_missing, log_denied, require_user};
use crate::store::WorkflowStore;

impl<S: WorkflowStore> WorkflowService<S> {
    /// Guarded read.
    pub fn get_sales_order(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<SalesOrder> {
        let acting = require_user(user)?;
        let order = self
            .store()
            .snapshot(|t| t.find::<SalesOrder>(tenant_id, order_id).cloned())?
            .ok_or(DomainError::NotFound)?;
        check_ownership(&order, Some(acting))?;
        Ok(order)
    }

    /// Orders the user may see, oldest first.
    pub fn list_sales_orders(
        &self,
        tenant_id: TenantId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<Vec<SalesOrder>> {
        let acting = require_user(user)?;
        Ok(self.store().snapshot(|t| {
            t.list::<SalesOrder>(tenant_id)
                .into_iter()
                .filter(|order| can_access(*order, acting))
                .cloned()
                .collect()
        })?)
    }

    /// Permission token for the order's current status.
    pub fn compute_permissions(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
    ) -> WorkflowResult<Permissions> {
        let order = self.get_sales_order(tenant_id, order_id, user)?;
        Ok(compute_permissions(&order, user))
    }

    pub fn perform_action(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        action: OrderAction,
        comment: Option<String>,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("perform_action", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::PerformAction(PerformAction {
                actor,
                action,
                comment,
                occurred_at: at,
            })
        })
    }

    pub fn edit_sales_order(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        patch: SalesOrderPatch,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("edit_sales_order", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::EditOrder(EditOrder {
                actor,
                patch,
                occurred_at: at,
            })
        })
    }

    pub fn request_reopen(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        reason: String,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("request_reopen", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::RequestReopen(RequestReopen {
                actor,
                reason,
                occurred_at: at,
            })
        })
    }

    pub fn approve_reopen(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        comment: Option<String>,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("approve_reopen", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::ApproveReopen(ResolveReopen {
                actor,
                comment,
                occurred_at: at,
            })
        })
    }

    pub fn reject_reopen(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        comment: Option<String>,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("reject_reopen", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::RejectReopen(ResolveReopen {
                actor,
                comment,
                occurred_at: at,
            })
        })
    }

    pub fn record_delivery(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        line_no: u32,
        quantity: i64,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("record_delivery", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::RecordDelivery(RecordDelivery {
                actor,
                line_no,
                quantity,
                occurred_at: at,
            })
        })
    }

    pub fn record_payment(
        &self,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        amount: u64,
    ) -> WorkflowResult<SalesOrder> {
        self.execute_on_order("record_payment", tenant_id, order_id, user, |actor, at| {
            SalesOrderCommand::RecordPayment(RecordPayment {
                actor,
                amount,
                occurred_at: at,
            })
        })
    }

    /// Load, guard, grant, execute, save.
    fn execute_on_order<F>(
        &self,
        operation: &'static str,
        tenant_id: TenantId,
        order_id: SalesOrderId,
        user: Option<&ActingUser>,
        command: F,
    ) -> WorkflowResult<SalesOrder>
    where
        F: FnOnce(UserId, DateTime<Utc>) -> SalesOrderCommand,
    {
        let result = self.store().transact(|tx| -> WorkflowResult<SalesOrder> {
            let acting = require_user(user)?;
            let mut order = tx
                .load::<SalesOrder>(tenant_id, order_id)
                .map_err(hide_missing)?;
            check_ownership(&order, Some(acting))?;

            let grant = compute_permissions(&order, Some(acting));
            let command = command(acting.id, Utc::now());
            let from = order.sale_status();
            let events = order.execute(&command, &grant)?;
            tx.update(order.clone())?;

            tracing::info!(
                operation,
                tenant_id = %tenant_id,
                order_id = %order_id,
                actor = %acting.id,
                from = %from,
                to = %order.sale_status(),
                events = ?events.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
                "sales order updated"
            );
            Ok(order)
        });
        if let Err(err) = &result {
            log_denied(operation, order_id.into(), user, err);
        }
        result
    }
}
