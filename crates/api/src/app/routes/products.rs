use std::sync::Arc;

use axum::{Json, Router, extract::Extension, routing::get};

use orderflow_infra::NewProduct;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new().route("/", get(list_products).post(register_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    errors::respond(services.list_products(tenant.tenant_id(), principal.acting_user()))
}

pub async fn register_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewProduct>,
) -> axum::response::Response {
    match services.register_product(tenant.tenant_id(), principal.acting_user(), body) {
        Ok(receipt) => errors::created(receipt),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
