//! Permission Engine.
//!
//! [`compute_permissions`] derives, from the order's status and owner and the
//! acting user's role, which fields may be edited and which actions performed.
//! The result is a capability token: it is bound to the order, the status it
//! was computed for and the actor, and every [`SalesOrder`] command must
//! present it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use orderflow_auth::classifier::{
    has_role, is_finance, is_manager_purchasing, is_manager_sales, is_purchasing, is_sales,
    is_superuser, is_warehouse,
};
use orderflow_auth::{ActingUser, Role};
use orderflow_core::{DomainError, DomainResult, TenantId, UserId};

use crate::{SaleStatus, SalesOrder, SalesOrderId};

/// Fields of a sales order that can be granted for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    Note,
    QuotationId,
    CustomerId,
    PaymentTermId,
    Items,
    FilePoCustomer,
    PaymentStatus,
    DeliveredQuantity,
}

impl EditableField {
    pub const ALL: [EditableField; 8] = [
        EditableField::Note,
        EditableField::QuotationId,
        EditableField::CustomerId,
        EditableField::PaymentTermId,
        EditableField::Items,
        EditableField::FilePoCustomer,
        EditableField::PaymentStatus,
        EditableField::DeliveredQuantity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditableField::Note => "note",
            EditableField::QuotationId => "quotation_id",
            EditableField::CustomerId => "customer_id",
            EditableField::PaymentTermId => "payment_term_id",
            EditableField::Items => "items",
            EditableField::FilePoCustomer => "file_po_customer",
            EditableField::PaymentStatus => "payment_status",
            EditableField::DeliveredQuantity => "delivered_quantity",
        }
    }
}

impl core::fmt::Display for EditableField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EditableField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EditableField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown field: {s}")))
    }
}

/// Fields sales may edit while the order is NEW.
const DRAFT_FIELDS: [EditableField; 6] = [
    EditableField::Note,
    EditableField::QuotationId,
    EditableField::CustomerId,
    EditableField::PaymentTermId,
    EditableField::Items,
    EditableField::FilePoCustomer,
];

/// Actions that move a sales order between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    UpdateStatusPr,
    UpdateStatusPo,
    UpdateStatusSr,
    UpdateStatusFar,
    UpdateStatusDr,
    UpdateStatusDelivery,
    UpdateStatusDelivered,
    UpdateStatusReceived,
    ApproveFar,
    Complete,
    Cancel,
    ReopenToNew,
}

impl OrderAction {
    pub const ALL: [OrderAction; 12] = [
        OrderAction::UpdateStatusPr,
        OrderAction::UpdateStatusPo,
        OrderAction::UpdateStatusSr,
        OrderAction::UpdateStatusFar,
        OrderAction::UpdateStatusDr,
        OrderAction::UpdateStatusDelivery,
        OrderAction::UpdateStatusDelivered,
        OrderAction::UpdateStatusReceived,
        OrderAction::ApproveFar,
        OrderAction::Complete,
        OrderAction::Cancel,
        OrderAction::ReopenToNew,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderAction::UpdateStatusPr => "update_status_pr",
            OrderAction::UpdateStatusPo => "update_status_po",
            OrderAction::UpdateStatusSr => "update_status_sr",
            OrderAction::UpdateStatusFar => "update_status_far",
            OrderAction::UpdateStatusDr => "update_status_dr",
            OrderAction::UpdateStatusDelivery => "update_status_delivery",
            OrderAction::UpdateStatusDelivered => "update_status_delivered",
            OrderAction::UpdateStatusReceived => "update_status_received",
            OrderAction::ApproveFar => "approve_far",
            OrderAction::Complete => "complete",
            OrderAction::Cancel => "cancel",
            OrderAction::ReopenToNew => "reopen_to_new",
        }
    }

    /// Status the order lands in once the action is performed.
    pub fn target_status(self) -> SaleStatus {
        match self {
            OrderAction::UpdateStatusPr => SaleStatus::Pr,
            OrderAction::UpdateStatusPo => SaleStatus::Po,
            OrderAction::UpdateStatusSr => SaleStatus::Sr,
            OrderAction::UpdateStatusFar => SaleStatus::Far,
            OrderAction::UpdateStatusDr | OrderAction::ApproveFar => SaleStatus::Dr,
            OrderAction::UpdateStatusDelivery => SaleStatus::Delivery,
            OrderAction::UpdateStatusDelivered => SaleStatus::Delivered,
            OrderAction::UpdateStatusReceived => SaleStatus::Received,
            OrderAction::Complete => SaleStatus::Completed,
            OrderAction::Cancel => SaleStatus::Cancelled,
            OrderAction::ReopenToNew => SaleStatus::New,
        }
    }

    /// The plain forward action out of `status`, if there is one.
    pub fn forward_from(status: SaleStatus) -> Option<OrderAction> {
        match status {
            SaleStatus::New => Some(OrderAction::UpdateStatusPr),
            SaleStatus::Pr => Some(OrderAction::UpdateStatusPo),
            SaleStatus::Po => Some(OrderAction::UpdateStatusSr),
            SaleStatus::Sr => Some(OrderAction::UpdateStatusFar),
            SaleStatus::Far => Some(OrderAction::UpdateStatusDr),
            SaleStatus::Dr => Some(OrderAction::UpdateStatusDelivery),
            SaleStatus::Delivery => Some(OrderAction::UpdateStatusDelivered),
            SaleStatus::Delivered => Some(OrderAction::UpdateStatusReceived),
            SaleStatus::Received => Some(OrderAction::Complete),
            SaleStatus::Completed | SaleStatus::Cancelled => None,
        }
    }
}

impl core::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown action: {s}")))
    }
}

/// Capability token for one (order, status, actor) triple.
///
/// Only [`compute_permissions`] creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permissions {
    tenant_id: TenantId,
    order_id: SalesOrderId,
    status: SaleStatus,
    actor: Option<UserId>,
    editable_fields: BTreeSet<EditableField>,
    available_actions: BTreeSet<OrderAction>,
    can_cancel: bool,
    can_request_reopen: bool,
    can_approve_reopen: bool,
    is_owner: bool,
}

impl Permissions {
    fn none(order: &SalesOrder, actor: Option<UserId>) -> Self {
        Self {
            tenant_id: order.tenant_id(),
            order_id: order.id_typed(),
            status: order.sale_status(),
            actor,
            editable_fields: BTreeSet::new(),
            available_actions: BTreeSet::new(),
            can_cancel: false,
            can_request_reopen: false,
            can_approve_reopen: false,
            is_owner: false,
        }
    }

    pub fn order_id(&self) -> SalesOrderId {
        self.order_id
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn actor(&self) -> Option<UserId> {
        self.actor
    }

    pub fn editable_fields(&self) -> &BTreeSet<EditableField> {
        &self.editable_fields
    }

    pub fn available_actions(&self) -> &BTreeSet<OrderAction> {
        &self.available_actions
    }

    pub fn can_cancel(&self) -> bool {
        self.can_cancel
    }

    pub fn can_request_reopen(&self) -> bool {
        self.can_request_reopen
    }

    pub fn can_approve_reopen(&self) -> bool {
        self.can_approve_reopen
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    pub fn allows_field(&self, field: EditableField) -> bool {
        self.editable_fields.contains(&field)
    }

    pub fn allows_action(&self, action: OrderAction) -> bool {
        self.available_actions.contains(&action)
    }

    /// Reject a token computed for another order, an older status or another
    /// user.
    pub fn ensure_issued_for(&self, order: &SalesOrder, actor: UserId) -> DomainResult<()> {
        if self.tenant_id != order.tenant_id() || self.order_id != order.id_typed() {
            return Err(DomainError::conflict("permissions were computed for another order"));
        }
        if self.status != order.sale_status() {
            return Err(DomainError::conflict(format!(
                "permissions were computed for status {} but the order is {}",
                self.status,
                order.sale_status()
            )));
        }
        if self.actor != Some(actor) {
            return Err(DomainError::conflict("permissions were computed for another user"));
        }
        Ok(())
    }

    pub fn ensure_action(&self, action: OrderAction) -> DomainResult<()> {
        if self.allows_action(action) {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "action {action} is not available in status {}",
                self.status
            )))
        }
    }

    pub fn ensure_field(&self, field: EditableField) -> DomainResult<()> {
        if self.allows_field(field) {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "field {field} is not editable in status {}",
                self.status
            )))
        }
    }
}

/// Set-membership check by wire name; unknown names are never editable.
pub fn is_field_editable(field: &str, permissions: &Permissions) -> bool {
    field
        .parse::<EditableField>()
        .is_ok_and(|f| permissions.allows_field(f))
}

/// Set-membership check by wire name; unknown names are never available.
pub fn is_action_available(action: &str, permissions: &Permissions) -> bool {
    action
        .parse::<OrderAction>()
        .is_ok_and(|a| permissions.allows_action(a))
}

/// Compute what `user` may do to `order` right now.
///
/// Never fails: no user, or a user without a recognised role, gets an empty
/// token.
pub fn compute_permissions(order: &SalesOrder, user: Option<&ActingUser>) -> Permissions {
    let Some(acting) = user else {
        return Permissions::none(order, None);
    };
    let mut p = Permissions::none(order, Some(acting.id));
    let status = order.sale_status();
    let owns = order.owner_id() == acting.id;
    p.is_owner = owns || is_superuser(user);

    match status {
        SaleStatus::New => {
            if is_sales(user) && (owns || is_manager_sales(user)) {
                p.editable_fields.extend(DRAFT_FIELDS);
                p.available_actions.insert(OrderAction::UpdateStatusPr);
            }
        }
        s if s.is_purchasing_chain() => {
            if is_purchasing(user) {
                p.editable_fields.insert(EditableField::Note);
                if let Some(forward) = OrderAction::forward_from(s) {
                    p.available_actions.insert(forward);
                }
            }
            if s == SaleStatus::Pr {
                let direct_reopen =
                    is_manager_sales(user) || is_superuser(user) || is_manager_purchasing(user);
                let pending = order.reopen_log().has_pending();
                if direct_reopen {
                    p.available_actions.insert(OrderAction::ReopenToNew);
                    p.can_approve_reopen = pending;
                } else if has_role(user, Role::Sales) && owns {
                    p.can_request_reopen = !pending;
                }
            }
            if s == SaleStatus::Far && is_finance(user) {
                p.available_actions.insert(OrderAction::ApproveFar);
            }
        }
        SaleStatus::Delivery => {
            if is_warehouse(user) {
                p.editable_fields
                    .extend([EditableField::Note, EditableField::DeliveredQuantity]);
                p.available_actions.insert(OrderAction::UpdateStatusDelivered);
            }
        }
        SaleStatus::Delivered => {
            if is_sales(user) {
                p.editable_fields.insert(EditableField::Note);
                p.available_actions.insert(OrderAction::UpdateStatusReceived);
            }
        }
        SaleStatus::Received => {
            if is_sales(user) {
                p.editable_fields.insert(EditableField::Note);
                p.available_actions.insert(OrderAction::Complete);
            }
        }
        _ => {}
    }

    if (is_superuser(user) || is_manager_sales(user)) && !status.is_terminal() {
        p.can_cancel = true;
        p.available_actions.insert(OrderAction::Cancel);
    }

    if is_finance(user) && status != SaleStatus::New && status != SaleStatus::Cancelled {
        p.editable_fields.insert(EditableField::PaymentStatus);
    }

    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::order_in;
    use proptest::prelude::*;

    fn user(id: i64, role: Role) -> ActingUser {
        ActingUser::new(UserId::new(id), role)
    }

    #[test]
    fn new_order_is_editable_by_its_sales_owner_only() {
        let order = order_in(SaleStatus::New, 10);

        let owner = compute_permissions(&order, Some(&user(10, Role::Sales)));
        assert!(owner.is_owner());
        assert!(is_field_editable("note", &owner));
        assert!(is_field_editable("items", &owner));
        assert!(is_action_available("update_status_pr", &owner));
        assert!(!owner.can_cancel());

        let other_sales = compute_permissions(&order, Some(&user(11, Role::Sales)));
        assert!(other_sales.editable_fields().is_empty());
        assert!(other_sales.available_actions().is_empty());

        let purchasing = compute_permissions(&order, Some(&user(30, Role::Purchasing)));
        assert!(purchasing.editable_fields().is_empty());
        assert!(purchasing.available_actions().is_empty());
    }

    #[test]
    fn manager_sales_drives_any_new_order_and_may_cancel() {
        let order = order_in(SaleStatus::New, 10);
        let p = compute_permissions(&order, Some(&user(20, Role::ManagerSales)));
        assert!(!p.is_owner());
        assert!(p.allows_action(OrderAction::UpdateStatusPr));
        assert!(p.allows_action(OrderAction::Cancel));
        assert!(p.can_cancel());
    }

    #[test]
    fn pr_owner_requests_while_managers_reopen_directly() {
        let order = order_in(SaleStatus::Pr, 10);

        let sales = compute_permissions(&order, Some(&user(10, Role::Sales)));
        assert!(sales.can_request_reopen());
        assert!(!sales.allows_action(OrderAction::ReopenToNew));

        let stranger = compute_permissions(&order, Some(&user(11, Role::Sales)));
        assert!(!stranger.can_request_reopen());

        for role in [Role::ManagerSales, Role::ManagerPurchasing, Role::Superuser] {
            let p = compute_permissions(&order, Some(&user(20, role)));
            assert!(p.allows_action(OrderAction::ReopenToNew), "{role}");
            assert!(!p.can_request_reopen(), "{role}");
            assert!(!p.can_approve_reopen(), "{role}");
        }

        let staff_purchasing = compute_permissions(&order, Some(&user(30, Role::Purchasing)));
        assert!(!staff_purchasing.allows_action(OrderAction::ReopenToNew));
        assert!(staff_purchasing.allows_action(OrderAction::UpdateStatusPo));
        assert_eq!(
            staff_purchasing.editable_fields().iter().copied().collect::<Vec<_>>(),
            vec![EditableField::Note]
        );
    }

    #[test]
    fn purchasing_chain_offers_single_forward_action() {
        let expected = [
            (SaleStatus::Pr, OrderAction::UpdateStatusPo),
            (SaleStatus::Po, OrderAction::UpdateStatusSr),
            (SaleStatus::Sr, OrderAction::UpdateStatusFar),
            (SaleStatus::Far, OrderAction::UpdateStatusDr),
            (SaleStatus::Dr, OrderAction::UpdateStatusDelivery),
        ];
        for (status, action) in expected {
            let p = compute_permissions(&order_in(status, 10), Some(&user(30, Role::Purchasing)));
            assert_eq!(p.available_actions().iter().copied().collect::<Vec<_>>(), vec![action]);
        }
    }

    #[test]
    fn finance_approves_far_and_edits_payment_status() {
        let far = compute_permissions(&order_in(SaleStatus::Far, 10), Some(&user(40, Role::Finance)));
        assert!(far.allows_action(OrderAction::ApproveFar));
        assert!(far.allows_field(EditableField::PaymentStatus));

        let new = compute_permissions(&order_in(SaleStatus::New, 10), Some(&user(40, Role::Finance)));
        assert!(!new.allows_field(EditableField::PaymentStatus));

        let cancelled =
            compute_permissions(&order_in(SaleStatus::Cancelled, 10), Some(&user(40, Role::Finance)));
        assert!(cancelled.editable_fields().is_empty());
    }

    #[test]
    fn downstream_statuses_belong_to_warehouse_then_sales() {
        let delivery =
            compute_permissions(&order_in(SaleStatus::Delivery, 10), Some(&user(50, Role::Warehouse)));
        assert!(delivery.allows_action(OrderAction::UpdateStatusDelivered));
        assert!(delivery.allows_field(EditableField::DeliveredQuantity));

        let delivered =
            compute_permissions(&order_in(SaleStatus::Delivered, 10), Some(&user(10, Role::Sales)));
        assert!(delivered.allows_action(OrderAction::UpdateStatusReceived));

        let received =
            compute_permissions(&order_in(SaleStatus::Received, 10), Some(&user(10, Role::Sales)));
        assert!(received.allows_action(OrderAction::Complete));
    }

    #[test]
    fn missing_or_roleless_user_gets_nothing() {
        let order = order_in(SaleStatus::New, 10);
        let p = compute_permissions(&order, None);
        assert!(p.editable_fields().is_empty());
        assert!(p.available_actions().is_empty());
        assert!(!p.is_owner());

        let roleless = ActingUser {
            id: UserId::new(10),
            role: None,
        };
        let p = compute_permissions(&order, Some(&roleless));
        assert!(p.editable_fields().is_empty());
        assert!(p.available_actions().is_empty());
    }

    #[test]
    fn unknown_names_are_never_granted() {
        let p = compute_permissions(&order_in(SaleStatus::New, 1), Some(&user(1, Role::Superuser)));
        assert!(!is_field_editable("sale_status", &p));
        assert!(!is_action_available("UPDATE_STATUS_PR", &p));
    }

    #[test]
    fn token_is_bound_to_status_and_actor() {
        let order = order_in(SaleStatus::New, 10);
        let p = compute_permissions(&order, Some(&user(10, Role::Sales)));
        assert_eq!(p.ensure_issued_for(&order, UserId::new(10)), Ok(()));
        assert!(matches!(
            p.ensure_issued_for(&order, UserId::new(11)),
            Err(DomainError::Conflict(_))
        ));
        let advanced = order_in(SaleStatus::Pr, 10);
        assert!(matches!(
            p.ensure_issued_for(&advanced, UserId::new(10)),
            Err(DomainError::Conflict(_))
        ));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        (0usize..Role::ALL.len()).prop_map(|i| Role::ALL[i])
    }

    fn any_status() -> impl Strategy<Value = SaleStatus> {
        (0usize..SaleStatus::ALL.len()).prop_map(|i| SaleStatus::ALL[i])
    }

    proptest! {
        /// Every granted action leads somewhere the registry allows.
        #[test]
        fn granted_actions_follow_the_transition_graph(
            status in any_status(),
            role in any_role(),
            uid in 1i64..20,
        ) {
            let order = order_in(status, 10);
            let p = compute_permissions(&order, Some(&user(uid, role)));
            for action in p.available_actions() {
                prop_assert!(crate::is_valid_transition(status, action.target_status()));
            }
        }

        /// Terminal orders expose no actions to anyone.
        #[test]
        fn terminal_orders_are_frozen(role in any_role(), completed in any::<bool>()) {
            let status = if completed { SaleStatus::Completed } else { SaleStatus::Cancelled };
            let p = compute_permissions(&order_in(status, 10), Some(&user(10, role)));
            prop_assert!(p.available_actions().is_empty());
            prop_assert!(!p.can_cancel());
        }
    }
}
