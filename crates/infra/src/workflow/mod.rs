//! Workflow service: the action surface the HTTP layer calls.
//!
//! Every operation runs as one store transaction:
//!
//! ```text
//! load record(s)
//!   ↓
//! Ownership Guard (hidden → NotFound)
//!   ↓
//! Permission Engine / status preconditions
//!   ↓
//! write every affected record, or nothing
//! ```

use thiserror::Error;

use orderflow_auth::ActingUser;
use orderflow_core::{DomainError, RecordId};

use crate::store::{StoreError, WorkflowStore};

pub mod conversion;
pub mod crm;
pub mod products;
pub mod sales_orders;

pub use conversion::Receipt;
pub use crm::{NewLead, QuotationStatusUpdate};
pub use products::NewProduct;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Domain(e) => e.code(),
            WorkflowError::Store(e) => e.code(),
        }
    }

    /// Domain view of the failure, when there is one.
    ///
    /// A missing row reads as `NotFound`, the same as a hidden one.
    pub fn as_domain(&self) -> Option<DomainError> {
        match self {
            WorkflowError::Domain(e) => Some(e.clone()),
            WorkflowError::Store(StoreError::NotFound { .. }) => Some(DomainError::NotFound),
            WorkflowError::Store(_) => None,
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Application service over a [`WorkflowStore`].
#[derive(Debug)]
pub struct WorkflowService<S> {
    store: S,
    default_company_code: String,
}

impl<S: WorkflowStore> WorkflowService<S> {
    pub fn new(store: S, default_company_code: impl Into<String>) -> Self {
        Self {
            store,
            default_company_code: default_company_code.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn default_company_code(&self) -> &str {
        &self.default_company_code
    }
}

/// The acting user, or `Unauthorized`.
pub(crate) fn require_user(user: Option<&ActingUser>) -> Result<&ActingUser, DomainError> {
    user.ok_or(DomainError::Unauthorized)
}

/// Store misses are reported exactly like guard denials.
pub(crate) fn hide_missing(err: StoreError) -> WorkflowError {
    match err {
        StoreError::NotFound { .. } => WorkflowError::Domain(DomainError::NotFound),
        other => WorkflowError::Store(other),
    }
}

pub(crate) fn log_denied(operation: &'static str, record: RecordId, user: Option<&ActingUser>, err: &WorkflowError) {
    if matches!(
        err,
        WorkflowError::Domain(DomainError::Forbidden(_) | DomainError::NotFound | DomainError::Unauthorized)
    ) {
        tracing::warn!(
            operation,
            record_id = %record,
            user_id = ?user.map(|u| u.id),
            role = ?user.and_then(|u| u.role),
            error = %err,
            "workflow operation denied"
        );
    }
}
