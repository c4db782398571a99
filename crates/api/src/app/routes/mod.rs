use axum::{
    Router,
    routing::{get, put},
};

pub mod crm;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/admin/company-code", put(system::set_company_code))
        .nest("/products", products::router())
        .nest("/crm", crm::router())
        .nest("/sales", sales::router())
        .nest("/purchases", purchases::router())
}
