use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_auth::{OwnedRecord, RecordKind};
use orderflow_core::{
    Aggregate, AggregateRoot, CustomerId, DomainError, DomainResult, Entity, Event, TenantId,
    UserId, record_id_newtype,
};
use orderflow_crm::QuotationId;
use orderflow_products::ProductId;

use crate::permissions::{EditableField, OrderAction, Permissions};
use crate::reopen::{ReopenEvent, ReopenEventKind, ReopenLog};
use crate::status::{SaleStatus, is_valid_transition};

record_id_newtype!(
    /// Sales order identifier (tenant-scoped).
    SalesOrderId,
    "SalesOrderId"
);

/// Payment sub-state, orthogonal to the lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Overdue,
}

/// Per-line fulfilment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Active,
    PartialDelivered,
    Delivered,
    Cancelled,
}

/// Order line input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub description: String,
    pub quantity: i64,
    pub unit_price: u64,
    pub delivered_quantity: i64,
    pub status: ItemStatus,
}

impl OrderItem {
    fn numbered(items: &[NewOrderItem]) -> Vec<OrderItem> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| OrderItem {
                line_no: idx as u32 + 1,
                product_id: item.product_id,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                delivered_quantity: 0,
                status: ItemStatus::Active,
            })
            .collect()
    }

    pub fn remaining(&self) -> i64 {
        self.quantity - self.delivered_quantity
    }
}

/// One entry of the status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: SaleStatus,
    pub to: SaleStatus,
    pub action: OrderAction,
    pub actor: UserId,
    pub at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Everything needed to create an order row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSalesOrder {
    pub id: SalesOrderId,
    pub tenant_id: TenantId,
    pub number: String,
    pub owner_id: UserId,
    pub customer_id: CustomerId,
    pub quotation_id: Option<QuotationId>,
    pub items: Vec<NewOrderItem>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    tenant_id: TenantId,
    number: String,
    sale_status: SaleStatus,
    payment_status: PaymentStatus,
    owner_id: UserId,
    customer_id: CustomerId,
    quotation_id: Option<QuotationId>,
    payment_term_id: Option<i64>,
    file_po_customer: Option<String>,
    note: Option<String>,
    items: Vec<OrderItem>,
    amount_paid: u64,
    due_date: Option<DateTime<Utc>>,
    finance_approved_by: Option<UserId>,
    reopen_log: ReopenLog,
    status_history: Vec<StatusChange>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SalesOrder {
    /// A freshly drafted order (status NEW).
    pub fn open(new: NewSalesOrder) -> Self {
        Self {
            id: new.id,
            tenant_id: new.tenant_id,
            number: new.number,
            sale_status: SaleStatus::New,
            payment_status: PaymentStatus::Unpaid,
            owner_id: new.owner_id,
            customer_id: new.customer_id,
            quotation_id: new.quotation_id,
            payment_term_id: None,
            file_po_customer: None,
            note: None,
            items: OrderItem::numbered(&new.items),
            amount_paid: 0,
            due_date: None,
            finance_approved_by: None,
            reopen_log: ReopenLog::new(),
            status_history: Vec::new(),
            version: 0,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// Load an order kept by the previous system, whose reopen state lived in
    /// the note as text markers.
    pub fn import_legacy(new: NewSalesOrder, sale_status: SaleStatus, note: Option<String>) -> Self {
        let at = new.created_at;
        let mut order = Self::open(new);
        order.sale_status = sale_status;
        order.reopen_log = ReopenLog::from_legacy_note(note.as_deref(), at);
        order.note = note;
        order
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn sale_status(&self) -> SaleStatus {
        self.sale_status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn quotation_id(&self) -> Option<QuotationId> {
        self.quotation_id
    }

    pub fn payment_term_id(&self) -> Option<i64> {
        self.payment_term_id
    }

    pub fn file_po_customer(&self) -> Option<&str> {
        self.file_po_customer.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn amount_paid(&self) -> u64 {
        self.amount_paid
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn finance_approved_by(&self) -> Option<UserId> {
        self.finance_approved_by
    }

    pub fn reopen_log(&self) -> &ReopenLog {
        &self.reopen_log
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Order total in smallest currency unit.
    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .filter(|item| item.status != ItemStatus::Cancelled)
            .map(|item| item.unit_price.saturating_mul(item.quantity.max(0) as u64))
            .sum()
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Entity for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> SalesOrderId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl OwnedRecord for SalesOrder {
    fn record_kind(&self) -> RecordKind {
        RecordKind::SalesOrder
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

/// Partial update of the editable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderPatch {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub quotation_id: Option<QuotationId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub payment_term_id: Option<i64>,
    #[serde(default)]
    pub items: Option<Vec<NewOrderItem>>,
    #[serde(default)]
    pub file_po_customer: Option<String>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl SalesOrderPatch {
    /// Fields the patch touches, as permission names.
    pub fn touched_fields(&self) -> Vec<EditableField> {
        let mut fields = Vec::new();
        if self.note.is_some() {
            fields.push(EditableField::Note);
        }
        if self.quotation_id.is_some() {
            fields.push(EditableField::QuotationId);
        }
        if self.customer_id.is_some() {
            fields.push(EditableField::CustomerId);
        }
        if self.payment_term_id.is_some() {
            fields.push(EditableField::PaymentTermId);
        }
        if self.items.is_some() {
            fields.push(EditableField::Items);
        }
        if self.file_po_customer.is_some() {
            fields.push(EditableField::FilePoCustomer);
        }
        // The due date belongs to the payment terms finance manages.
        if self.payment_status.is_some() || self.due_date.is_some() {
            fields.push(EditableField::PaymentStatus);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }
}

/// Command: PerformAction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformAction {
    pub actor: UserId,
    pub action: OrderAction,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOrder {
    pub actor: UserId,
    pub patch: SalesOrderPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestReopen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReopen {
    pub actor: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveReopen (approve or reject the pending request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveReopen {
    pub actor: UserId,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDelivery {
    pub actor: UserId,
    pub line_no: u32,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub actor: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    PerformAction(PerformAction),
    EditOrder(EditOrder),
    RequestReopen(RequestReopen),
    ApproveReopen(ResolveReopen),
    RejectReopen(ResolveReopen),
    RecordDelivery(RecordDelivery),
    RecordPayment(RecordPayment),
}

impl SalesOrderCommand {
    pub fn actor(&self) -> UserId {
        match self {
            SalesOrderCommand::PerformAction(c) => c.actor,
            SalesOrderCommand::EditOrder(c) => c.actor,
            SalesOrderCommand::RequestReopen(c) => c.actor,
            SalesOrderCommand::ApproveReopen(c) | SalesOrderCommand::RejectReopen(c) => c.actor,
            SalesOrderCommand::RecordDelivery(c) => c.actor,
            SalesOrderCommand::RecordPayment(c) => c.actor,
        }
    }
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub change: StatusChange,
}

/// Event: FieldsEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsEdited {
    pub actor: UserId,
    pub patch: SalesOrderPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReopenRecorded (request, approval or rejection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenRecorded {
    pub entry: ReopenEvent,
}

/// Event: FinanceApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceApproved {
    pub approver: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDelivered {
    pub actor: UserId,
    pub line_no: u32,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub actor: UserId,
    pub amount: u64,
    pub payment_status: PaymentStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    StatusChanged(StatusChanged),
    FieldsEdited(FieldsEdited),
    ReopenRecorded(ReopenRecorded),
    FinanceApproved(FinanceApproved),
    ItemDelivered(ItemDelivered),
    PaymentRecorded(PaymentRecorded),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::StatusChanged(_) => "sales.order.status_changed",
            SalesOrderEvent::FieldsEdited(_) => "sales.order.fields_edited",
            SalesOrderEvent::ReopenRecorded(e) => match e.entry.kind {
                ReopenEventKind::Request => "sales.order.reopen_requested",
                ReopenEventKind::Approve => "sales.order.reopen_approved",
                ReopenEventKind::Reject => "sales.order.reopen_rejected",
            },
            SalesOrderEvent::FinanceApproved(_) => "sales.order.finance_approved",
            SalesOrderEvent::ItemDelivered(_) => "sales.order.item_delivered",
            SalesOrderEvent::PaymentRecorded(_) => "sales.order.payment_recorded",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::StatusChanged(e) => e.change.at,
            SalesOrderEvent::FieldsEdited(e) => e.occurred_at,
            SalesOrderEvent::ReopenRecorded(e) => e.entry.at,
            SalesOrderEvent::FinanceApproved(e) => e.occurred_at,
            SalesOrderEvent::ItemDelivered(e) => e.occurred_at,
            SalesOrderEvent::PaymentRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Grant = Permissions;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::StatusChanged(e) => {
                self.sale_status = e.change.to;
                if e.change.to == SaleStatus::Cancelled {
                    for item in &mut self.items {
                        if matches!(item.status, ItemStatus::Active | ItemStatus::PartialDelivered) {
                            item.status = ItemStatus::Cancelled;
                        }
                    }
                }
                self.status_history.push(e.change.clone());
            }
            SalesOrderEvent::FieldsEdited(e) => self.apply_patch(&e.patch),
            SalesOrderEvent::ReopenRecorded(e) => self.reopen_log.append(e.entry.clone()),
            SalesOrderEvent::FinanceApproved(e) => self.finance_approved_by = Some(e.approver),
            SalesOrderEvent::ItemDelivered(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.line_no == e.line_no) {
                    item.delivered_quantity += e.quantity;
                    item.status = if item.delivered_quantity >= item.quantity {
                        ItemStatus::Delivered
                    } else {
                        ItemStatus::PartialDelivered
                    };
                }
            }
            SalesOrderEvent::PaymentRecorded(e) => {
                self.amount_paid = self.amount_paid.saturating_add(e.amount);
                self.payment_status = e.payment_status;
            }
        }

        self.updated_at = event.occurred_at();
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(
        &self,
        command: &Self::Command,
        grant: &Self::Grant,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        grant.ensure_issued_for(self, command.actor())?;
        match command {
            SalesOrderCommand::PerformAction(cmd) => self.handle_perform(cmd, grant),
            SalesOrderCommand::EditOrder(cmd) => self.handle_edit(cmd, grant),
            SalesOrderCommand::RequestReopen(cmd) => self.handle_request_reopen(cmd, grant),
            SalesOrderCommand::ApproveReopen(cmd) => self.handle_approve_reopen(cmd, grant),
            SalesOrderCommand::RejectReopen(cmd) => self.handle_reject_reopen(cmd, grant),
            SalesOrderCommand::RecordDelivery(cmd) => self.handle_delivery(cmd, grant),
            SalesOrderCommand::RecordPayment(cmd) => self.handle_payment(cmd, grant),
        }
    }
}

impl SalesOrder {
    fn apply_patch(&mut self, patch: &SalesOrderPatch) {
        if let Some(note) = &patch.note {
            self.note = Some(note.clone());
        }
        if let Some(quotation_id) = patch.quotation_id {
            self.quotation_id = Some(quotation_id);
        }
        if let Some(customer_id) = patch.customer_id {
            self.customer_id = customer_id;
        }
        if let Some(term) = patch.payment_term_id {
            self.payment_term_id = Some(term);
        }
        if let Some(items) = &patch.items {
            self.items = OrderItem::numbered(items);
        }
        if let Some(file) = &patch.file_po_customer {
            self.file_po_customer = Some(file.clone());
        }
        if let Some(status) = patch.payment_status {
            self.payment_status = status;
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
    }

    fn status_change(
        &self,
        to: SaleStatus,
        action: OrderAction,
        actor: UserId,
        at: DateTime<Utc>,
        comment: Option<String>,
    ) -> DomainResult<SalesOrderEvent> {
        if !is_valid_transition(self.sale_status, to) {
            return Err(DomainError::invariant(format!(
                "{} -> {to} is not a valid transition",
                self.sale_status
            )));
        }
        Ok(SalesOrderEvent::StatusChanged(StatusChanged {
            change: StatusChange {
                from: self.sale_status,
                to,
                action,
                actor,
                at,
                comment,
            },
        }))
    }

    fn reopen_entry(
        kind: ReopenEventKind,
        actor: UserId,
        at: DateTime<Utc>,
        comment: Option<String>,
    ) -> SalesOrderEvent {
        SalesOrderEvent::ReopenRecorded(ReopenRecorded {
            entry: ReopenEvent {
                kind,
                actor: Some(actor),
                at,
                comment,
            },
        })
    }

    fn handle_perform(
        &self,
        cmd: &PerformAction,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        grant.ensure_action(cmd.action)?;

        let mut events = Vec::new();
        if cmd.action == OrderAction::ApproveFar {
            events.push(SalesOrderEvent::FinanceApproved(FinanceApproved {
                approver: cmd.actor,
                occurred_at: cmd.occurred_at,
            }));
        }
        if self.reopen_log.has_pending() {
            // Leaving PR settles an outstanding request: a direct reopen grants
            // it, any other move closes it.
            let (kind, comment) = match cmd.action {
                OrderAction::ReopenToNew => (ReopenEventKind::Approve, cmd.comment.clone()),
                OrderAction::Cancel => (ReopenEventKind::Reject, Some("order cancelled".to_string())),
                _ => (ReopenEventKind::Reject, Some("order advanced".to_string())),
            };
            events.push(Self::reopen_entry(kind, cmd.actor, cmd.occurred_at, comment));
        }
        events.push(self.status_change(
            cmd.action.target_status(),
            cmd.action,
            cmd.actor,
            cmd.occurred_at,
            cmd.comment.clone(),
        )?);
        Ok(events)
    }

    fn handle_edit(
        &self,
        cmd: &EditOrder,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        let fields = cmd.patch.touched_fields();
        if fields.is_empty() {
            return Err(DomainError::validation("nothing to update"));
        }
        for field in fields {
            grant.ensure_field(field)?;
        }

        if let Some(items) = &cmd.patch.items {
            if items.iter().any(|item| item.quantity <= 0) {
                return Err(DomainError::validation("item quantity must be positive"));
            }
        }

        Ok(vec![SalesOrderEvent::FieldsEdited(FieldsEdited {
            actor: cmd.actor,
            patch: cmd.patch.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_reopen(
        &self,
        cmd: &RequestReopen,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.sale_status != SaleStatus::Pr {
            return Err(DomainError::precondition("reopen is only possible from PR"));
        }
        if self.reopen_log.has_pending() {
            return Err(DomainError::precondition("a reopen request is already pending"));
        }
        if !grant.can_request_reopen() {
            return Err(DomainError::forbidden("not allowed to request a reopen"));
        }
        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("a reason is required to request a reopen"));
        }

        Ok(vec![Self::reopen_entry(
            ReopenEventKind::Request,
            cmd.actor,
            cmd.occurred_at,
            Some(reason.to_string()),
        )])
    }

    fn ensure_can_resolve(&self, grant: &Permissions) -> DomainResult<()> {
        if self.sale_status != SaleStatus::Pr {
            return Err(DomainError::precondition("reopen is only possible from PR"));
        }
        if !self.reopen_log.has_pending() {
            return Err(DomainError::precondition("there is no pending reopen request"));
        }
        if !grant.can_approve_reopen() {
            return Err(DomainError::forbidden("not allowed to resolve reopen requests"));
        }
        Ok(())
    }

    fn handle_approve_reopen(
        &self,
        cmd: &ResolveReopen,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_can_resolve(grant)?;
        Ok(vec![
            Self::reopen_entry(
                ReopenEventKind::Approve,
                cmd.actor,
                cmd.occurred_at,
                cmd.comment.clone(),
            ),
            self.status_change(
                SaleStatus::New,
                OrderAction::ReopenToNew,
                cmd.actor,
                cmd.occurred_at,
                cmd.comment.clone(),
            )?,
        ])
    }

    fn handle_reject_reopen(
        &self,
        cmd: &ResolveReopen,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_can_resolve(grant)?;
        Ok(vec![Self::reopen_entry(
            ReopenEventKind::Reject,
            cmd.actor,
            cmd.occurred_at,
            cmd.comment.clone(),
        )])
    }

    fn handle_delivery(
        &self,
        cmd: &RecordDelivery,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        grant.ensure_field(EditableField::DeliveredQuantity)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("delivered quantity must be positive"));
        }
        let item = self
            .items
            .iter()
            .find(|item| item.line_no == cmd.line_no)
            .ok_or_else(|| DomainError::validation(format!("no line {}", cmd.line_no)))?;
        if item.status == ItemStatus::Cancelled {
            return Err(DomainError::precondition(format!("line {} is cancelled", cmd.line_no)));
        }
        if cmd.quantity > item.remaining() {
            return Err(DomainError::validation(format!(
                "line {} has only {} left to deliver",
                cmd.line_no,
                item.remaining()
            )));
        }

        Ok(vec![SalesOrderEvent::ItemDelivered(ItemDelivered {
            actor: cmd.actor,
            line_no: cmd.line_no,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_payment(
        &self,
        cmd: &RecordPayment,
        grant: &Permissions,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        grant.ensure_field(EditableField::PaymentStatus)?;

        if cmd.amount == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        let paid = self.amount_paid.saturating_add(cmd.amount);
        let payment_status = if paid >= self.total() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };

        Ok(vec![SalesOrderEvent::PaymentRecorded(PaymentRecorded {
            actor: cmd.actor,
            amount: cmd.amount,
            payment_status,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_permissions;
    use crate::test_support::{order_in, order_with_note};
    use orderflow_auth::{ActingUser, Role};

    fn user(id: i64, role: Role) -> ActingUser {
        ActingUser::new(UserId::new(id), role)
    }

    fn perform(order: &mut SalesOrder, who: ActingUser, action: OrderAction) -> DomainResult<Vec<SalesOrderEvent>> {
        let grant = compute_permissions(order, Some(&who));
        order.execute(
            &SalesOrderCommand::PerformAction(PerformAction {
                actor: who.id,
                action,
                comment: None,
                occurred_at: Utc::now(),
            }),
            &grant,
        )
    }

    #[test]
    fn full_lifecycle_new_to_completed() {
        let mut order = order_in(SaleStatus::New, 10);
        let sales = user(10, Role::Sales);
        let purchasing = user(30, Role::Purchasing);
        let finance = user(40, Role::Finance);
        let warehouse = user(50, Role::Warehouse);

        perform(&mut order, sales, OrderAction::UpdateStatusPr).unwrap();
        perform(&mut order, purchasing, OrderAction::UpdateStatusPo).unwrap();
        perform(&mut order, purchasing, OrderAction::UpdateStatusSr).unwrap();
        perform(&mut order, purchasing, OrderAction::UpdateStatusFar).unwrap();
        perform(&mut order, finance, OrderAction::ApproveFar).unwrap();
        assert_eq!(order.sale_status(), SaleStatus::Dr);
        assert_eq!(order.finance_approved_by(), Some(finance.id));

        perform(&mut order, purchasing, OrderAction::UpdateStatusDelivery).unwrap();
        perform(&mut order, warehouse, OrderAction::UpdateStatusDelivered).unwrap();
        perform(&mut order, sales, OrderAction::UpdateStatusReceived).unwrap();
        perform(&mut order, sales, OrderAction::Complete).unwrap();

        assert_eq!(order.sale_status(), SaleStatus::Completed);
        assert_eq!(order.status_history().len(), 9);
        // ApproveFar emits two events.
        assert_eq!(order.version(), 10);
    }

    #[test]
    fn action_outside_the_grant_is_forbidden() {
        let mut order = order_in(SaleStatus::New, 10);
        let err = perform(&mut order, user(30, Role::Purchasing), OrderAction::UpdateStatusPr).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(order.sale_status(), SaleStatus::New);
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn stale_grant_is_a_conflict() {
        let mut order = order_in(SaleStatus::New, 10);
        let sales = user(10, Role::Sales);
        let stale = compute_permissions(&order, Some(&sales));
        perform(&mut order, sales, OrderAction::UpdateStatusPr).unwrap();

        let err = order
            .handle(
                &SalesOrderCommand::EditOrder(EditOrder {
                    actor: sales.id,
                    patch: SalesOrderPatch {
                        note: Some("late edit".into()),
                        ..Default::default()
                    },
                    occurred_at: Utc::now(),
                }),
                &stale,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn grant_for_another_user_is_a_conflict() {
        let order = order_in(SaleStatus::New, 10);
        let grant = compute_permissions(&order, Some(&user(10, Role::Sales)));
        let err = order
            .handle(
                &SalesOrderCommand::PerformAction(PerformAction {
                    actor: UserId::new(99),
                    action: OrderAction::UpdateStatusPr,
                    comment: None,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn edit_rejects_fields_not_granted() {
        let mut order = order_in(SaleStatus::Pr, 10);
        let purchasing = user(30, Role::Purchasing);
        let grant = compute_permissions(&order, Some(&purchasing));
        let err = order
            .execute(
                &SalesOrderCommand::EditOrder(EditOrder {
                    actor: purchasing.id,
                    patch: SalesOrderPatch {
                        note: Some("vendor confirmed".into()),
                        customer_id: Some(CustomerId::new(77)),
                        ..Default::default()
                    },
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(msg) if msg.contains("customer_id")));
        assert_eq!(order.note(), None);

        order
            .execute(
                &SalesOrderCommand::EditOrder(EditOrder {
                    actor: purchasing.id,
                    patch: SalesOrderPatch {
                        note: Some("vendor confirmed".into()),
                        ..Default::default()
                    },
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();
        assert_eq!(order.note(), Some("vendor confirmed"));
    }

    #[test]
    fn reopen_request_then_approval_returns_order_to_new() {
        let mut order = order_in(SaleStatus::Pr, 10);
        let sales = user(10, Role::Sales);
        let manager = user(20, Role::ManagerSales);

        let grant = compute_permissions(&order, Some(&sales));
        order
            .execute(
                &SalesOrderCommand::RequestReopen(RequestReopen {
                    actor: sales.id,
                    reason: "customer changed quantities".into(),
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();
        assert!(order.reopen_log().has_pending());
        assert!(!compute_permissions(&order, Some(&sales)).can_request_reopen());

        let grant = compute_permissions(&order, Some(&manager));
        assert!(grant.can_approve_reopen());
        order
            .execute(
                &SalesOrderCommand::ApproveReopen(ResolveReopen {
                    actor: manager.id,
                    comment: Some("ok".into()),
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();

        assert_eq!(order.sale_status(), SaleStatus::New);
        assert!(!order.reopen_log().has_pending());
        let last = order.status_history().last().unwrap();
        assert_eq!((last.from, last.to, last.action), (SaleStatus::Pr, SaleStatus::New, OrderAction::ReopenToNew));
    }

    #[test]
    fn duplicate_or_blank_reopen_requests_are_rejected() {
        let mut order = order_in(SaleStatus::Pr, 10);
        let sales = user(10, Role::Sales);
        let request = |reason: &str| {
            SalesOrderCommand::RequestReopen(RequestReopen {
                actor: sales.id,
                reason: reason.into(),
                occurred_at: Utc::now(),
            })
        };

        let grant = compute_permissions(&order, Some(&sales));
        assert!(matches!(order.handle(&request("   "), &grant), Err(DomainError::Validation(_))));

        order.execute(&request("wrong vendor"), &grant).unwrap();
        let grant = compute_permissions(&order, Some(&sales));
        assert!(matches!(
            order.handle(&request("again"), &grant),
            Err(DomainError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn rejection_keeps_status_and_allows_a_new_request() {
        let mut order = order_with_note(SaleStatus::Pr, 10, "[REOPEN REQUEST] legacy ask");
        let sales = user(10, Role::Sales);
        let manager = user(21, Role::ManagerPurchasing);

        let grant = compute_permissions(&order, Some(&manager));
        order
            .execute(
                &SalesOrderCommand::RejectReopen(ResolveReopen {
                    actor: manager.id,
                    comment: None,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();
        assert_eq!(order.sale_status(), SaleStatus::Pr);
        assert!(compute_permissions(&order, Some(&sales)).can_request_reopen());
    }

    #[test]
    fn plain_sales_cannot_resolve_requests() {
        let order = order_with_note(SaleStatus::Pr, 10, "[REOPEN REQUEST]");
        let sales = user(10, Role::Sales);
        let grant = compute_permissions(&order, Some(&sales));
        let err = order
            .handle(
                &SalesOrderCommand::ApproveReopen(ResolveReopen {
                    actor: sales.id,
                    comment: None,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn direct_reopen_settles_a_pending_request() {
        let mut order = order_with_note(SaleStatus::Pr, 10, "[REOPEN REQUEST]");
        perform(&mut order, user(1, Role::Superuser), OrderAction::ReopenToNew).unwrap();
        assert_eq!(order.sale_status(), SaleStatus::New);
        assert_eq!(
            order.reopen_log().last().map(|e| e.kind),
            Some(ReopenEventKind::Approve)
        );
    }

    #[test]
    fn leaving_pr_closes_a_pending_request() {
        let mut order = order_in(SaleStatus::Pr, 10);
        let sales = user(10, Role::Sales);
        let grant = compute_permissions(&order, Some(&sales));
        order
            .execute(
                &SalesOrderCommand::RequestReopen(RequestReopen {
                    actor: sales.id,
                    reason: "wrong vendor".into(),
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();

        perform(&mut order, user(30, Role::Purchasing), OrderAction::UpdateStatusPo).unwrap();
        assert_eq!(order.sale_status(), SaleStatus::Po);
        assert!(!order.reopen_log().has_pending());
        let last = order.reopen_log().last().unwrap();
        assert_eq!(last.kind, ReopenEventKind::Reject);
        assert_eq!(last.comment.as_deref(), Some("order advanced"));

        let superuser = user(1, Role::Superuser);
        let grant = compute_permissions(&order, Some(&superuser));
        let err = order
            .handle(
                &SalesOrderCommand::ApproveReopen(ResolveReopen {
                    actor: superuser.id,
                    comment: None,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
    }

    #[test]
    fn cancelling_with_a_pending_request_closes_it() {
        let mut order = order_with_note(SaleStatus::Pr, 10, "[REOPEN REQUEST]");
        perform(&mut order, user(20, Role::ManagerSales), OrderAction::Cancel).unwrap();
        assert_eq!(order.sale_status(), SaleStatus::Cancelled);
        assert!(!order.reopen_log().has_pending());
        assert_eq!(
            order.reopen_log().last().and_then(|e| e.comment.as_deref()),
            Some("order cancelled")
        );
    }

    #[test]
    fn cancel_cancels_open_items_only() {
        let mut order = order_in(SaleStatus::Delivery, 10);
        let warehouse = user(50, Role::Warehouse);
        let grant = compute_permissions(&order, Some(&warehouse));
        order
            .execute(
                &SalesOrderCommand::RecordDelivery(RecordDelivery {
                    actor: warehouse.id,
                    line_no: 1,
                    quantity: 2,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();
        assert_eq!(order.items()[0].status, ItemStatus::Delivered);

        perform(&mut order, user(20, Role::ManagerSales), OrderAction::Cancel).unwrap();
        assert_eq!(order.sale_status(), SaleStatus::Cancelled);
        assert_eq!(order.items()[0].status, ItemStatus::Delivered);
        assert_eq!(order.items()[1].status, ItemStatus::Cancelled);
    }

    #[test]
    fn delivery_cannot_exceed_ordered_quantity() {
        let mut order = order_in(SaleStatus::Delivery, 10);
        let warehouse = user(50, Role::Warehouse);
        let deliver = |qty| {
            SalesOrderCommand::RecordDelivery(RecordDelivery {
                actor: warehouse.id,
                line_no: 2,
                quantity: qty,
                occurred_at: Utc::now(),
            })
        };

        let grant = compute_permissions(&order, Some(&warehouse));
        order.execute(&deliver(1), &grant).unwrap();
        assert_eq!(order.items()[1].status, ItemStatus::PartialDelivered);
        assert!(matches!(order.handle(&deliver(5), &grant), Err(DomainError::Validation(_))));
    }

    #[test]
    fn payments_move_payment_status_only() {
        let mut order = order_in(SaleStatus::Dr, 10);
        let finance = user(40, Role::Finance);
        let pay = |amount| {
            SalesOrderCommand::RecordPayment(RecordPayment {
                actor: finance.id,
                amount,
                occurred_at: Utc::now(),
            })
        };

        let total = order.total();
        let grant = compute_permissions(&order, Some(&finance));
        order.execute(&pay(total / 2), &grant).unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Partial);
        order.execute(&pay(total - total / 2), &grant).unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.sale_status(), SaleStatus::Dr);

        let sales = user(10, Role::Sales);
        let grant = compute_permissions(&order, Some(&sales));
        let err = order
            .handle(
                &SalesOrderCommand::RecordPayment(RecordPayment {
                    actor: sales.id,
                    amount: 1,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = order_in(SaleStatus::New, 10);
        let before = order.clone();
        let sales = user(10, Role::Sales);
        let grant = compute_permissions(&order, Some(&sales));
        let events = order
            .handle(
                &SalesOrderCommand::PerformAction(PerformAction {
                    actor: sales.id,
                    action: OrderAction::UpdateStatusPr,
                    comment: None,
                    occurred_at: Utc::now(),
                }),
                &grant,
            )
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(order, before);
    }
}
