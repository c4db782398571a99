use orderflow_infra::{InMemoryStore, WorkflowService};

use crate::config::ApiConfig;

/// The workflow service every handler talks to.
pub type AppServices = WorkflowService<InMemoryStore>;

pub fn build_services(config: &ApiConfig) -> AppServices {
    tracing::info!(
        default_company_code = %config.default_company_code,
        "workflow service ready (in-memory store)"
    );
    WorkflowService::new(InMemoryStore::new(), config.default_company_code.clone())
}
