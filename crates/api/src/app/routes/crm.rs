use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use orderflow_crm::{LeadId, LeadStatus, QuotationId};
use orderflow_infra::{NewLead, QuotationStatusUpdate};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .nest("/leads", leads_router())
        .nest("/quotations", quotations_router())
}

fn leads_router() -> Router {
    Router::new()
        .route("/", post(create_lead))
        .route("/:id", get(get_lead))
        .route("/:id/status", post(update_lead_status))
        .route("/:id/convert", post(convert_lead))
}

fn quotations_router() -> Router {
    Router::new()
        .route("/:id", get(get_quotation))
        .route("/:id/status", post(update_quotation_status))
        .route("/:id/convert", post(convert_quotation))
}

pub async fn create_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewLead>,
) -> axum::response::Response {
    match services.create_lead(tenant.tenant_id(), principal.acting_user(), body) {
        Ok(receipt) => errors::created(receipt),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let lead_id: LeadId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.get_lead(tenant.tenant_id(), lead_id, principal.acting_user()))
}

pub async fn update_lead_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::LeadStatusRequest>,
) -> axum::response::Response {
    let lead_id: LeadId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status: LeadStatus = match dto::parse(&body.status) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.update_lead_status(
        tenant.tenant_id(),
        lead_id,
        principal.acting_user(),
        status,
    ))
}

/// Opportunity → draft quotation.
pub async fn convert_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::ConvertLeadRequest>>,
) -> axum::response::Response {
    let lead_id: LeadId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match services.convert_lead_to_quotation(
        tenant.tenant_id(),
        lead_id,
        principal.acting_user(),
        body.customer_id,
    ) {
        Ok(receipt) => errors::created(receipt),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_quotation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let quotation_id: QuotationId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.get_quotation(tenant.tenant_id(), quotation_id, principal.acting_user()))
}

pub async fn update_quotation_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<QuotationStatusUpdate>,
) -> axum::response::Response {
    let quotation_id: QuotationId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(services.update_quotation_status(
        tenant.tenant_id(),
        quotation_id,
        principal.acting_user(),
        body,
    ))
}

/// Accepted quotation → NEW sales order.
pub async fn convert_quotation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let quotation_id: QuotationId = match dto::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.convert_quotation_to_sales_order(
        tenant.tenant_id(),
        quotation_id,
        principal.acting_user(),
    ) {
        Ok(receipt) => errors::created(receipt),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
