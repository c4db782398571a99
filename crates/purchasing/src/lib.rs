//! Purchasing: purchase orders raised against sales orders.
//!
//! Pure domain logic; creation happens through the conversion pipeline in
//! `orderflow-infra`.

pub mod order;

pub use order::{
    PurchaseOrder, PurchaseOrderId, PurchaseOrderLine, PurchaseOrderStatus,
    check_purchase_order_access,
};
