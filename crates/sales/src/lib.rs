//! Sales order lifecycle.
//!
//! - [`status`]: the status registry and transition graph
//! - [`permissions`]: the permission engine and its capability token
//! - [`reopen`]: reopen protocol state
//! - [`order`]: the `SalesOrder` aggregate, which only mutates when handed a
//!   token computed for its current status
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod permissions;
pub mod reopen;
pub mod status;

pub use order::{
    EditOrder, FieldsEdited, FinanceApproved, ItemDelivered, ItemStatus, NewOrderItem,
    NewSalesOrder, OrderItem, PaymentRecorded, PaymentStatus, PerformAction, RecordDelivery,
    RecordPayment, ReopenRecorded, RequestReopen, ResolveReopen, SalesOrder, SalesOrderCommand,
    SalesOrderEvent, SalesOrderId, SalesOrderPatch, StatusChange, StatusChanged,
};
pub use permissions::{
    EditableField, OrderAction, Permissions, compute_permissions, is_action_available,
    is_field_editable,
};
pub use reopen::{ReopenEvent, ReopenEventKind, ReopenLog, has_pending_reopen_request};
pub use status::{SaleStatus, is_valid_transition, next_possible_statuses};
