use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    let user = principal.user();
    Json(serde_json::json!({
        "success": true,
        "tenant_id": tenant.tenant_id().to_string(),
        "user_id": user.id,
        "role": user.role.map(|r| r.as_str()),
        "claimed_role": principal.claimed_role(),
    }))
}

pub async fn set_company_code(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CompanyCodeRequest>,
) -> axum::response::Response {
    errors::respond(
        services
            .set_company_code(tenant.tenant_id(), principal.acting_user(), &body.company_code)
            .map(|()| serde_json::json!({ "company_code": body.company_code.trim() })),
    )
}
