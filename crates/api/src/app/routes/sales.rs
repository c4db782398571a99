use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use orderflow_sales::{OrderAction, SalesOrderId, SalesOrderPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/", get(list_sales_orders))
        .route("/:id", get(get_sales_order).patch(edit_sales_order))
        .route("/:id/permissions", get(get_permissions))
        .route("/:id/actions", post(perform_action))
        .route("/:id/reopen/request", post(request_reopen))
        .route("/:id/reopen/approve", post(approve_reopen))
        .route("/:id/reopen/reject", post(reject_reopen))
        .route("/:id/deliveries", post(record_delivery))
        .route("/:id/payments", post(record_payment))
        .route("/:id/purchase-orders", post(create_purchase_order))
}

fn order_id(raw: &str) -> Result<SalesOrderId, axum::response::Response> {
    dto::parse(raw)
}

pub async fn list_sales_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    errors::respond(services.list_sales_orders(tenant.tenant_id(), principal.acting_user()))
}

pub async fn get_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.get_sales_order(tenant.tenant_id(), order_id, principal.acting_user()))
}

/// What the caller may edit and do on this order right now.
pub async fn get_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.compute_permissions(tenant.tenant_id(), order_id, principal.acting_user()))
}

pub async fn perform_action(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ActionRequest>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let action: OrderAction = match dto::parse(&body.action) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.perform_action(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        action,
        body.comment,
    ))
}

pub async fn edit_sales_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(patch): Json<SalesOrderPatch>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.edit_sales_order(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        patch,
    ))
}

pub async fn request_reopen(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReopenRequest>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.request_reopen(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        body.reason,
    ))
}

pub async fn approve_reopen(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::ResolveReopenRequest>>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    errors::respond(services.approve_reopen(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        body.comment,
    ))
}

pub async fn reject_reopen(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::ResolveReopenRequest>>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    errors::respond(services.reject_reopen(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        body.comment,
    ))
}

pub async fn record_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::DeliveryRequest>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.record_delivery(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        body.line_no,
        body.quantity,
    ))
}

pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PaymentRequest>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.record_payment(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        body.amount,
    ))
}

/// Raise a purchase order for this sales order (PR → PO, or supplemental).
pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::CreatePurchaseOrderRequest>>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match services.create_purchase_order_from_sales_order(
        tenant.tenant_id(),
        order_id,
        principal.acting_user(),
        body.vendor_id,
        body.note,
    ) {
        Ok(receipt) => errors::created(receipt),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
