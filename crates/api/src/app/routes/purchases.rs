use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use orderflow_purchasing::PurchaseOrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/:id", get(get_purchase_order))
        .route("/:id/status", post(update_purchase_order_status))
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let purchase_order_id: PurchaseOrderId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.get_purchase_order(
        tenant.tenant_id(),
        purchase_order_id,
        principal.acting_user(),
    ))
}

pub async fn update_purchase_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PurchaseOrderStatusRequest>,
) -> axum::response::Response {
    let purchase_order_id: PurchaseOrderId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.update_purchase_order_status(
        tenant.tenant_id(),
        purchase_order_id,
        principal.acting_user(),
        body.status,
    ))
}
