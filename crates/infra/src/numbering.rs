//! Document number allocation.

use chrono::{DateTime, Utc};

use orderflow_core::{DocumentNumber, DocumentPrefix, TenantId};

use crate::store::Transaction;
use crate::workflow::WorkflowError;

/// Allocate the next `{PREFIX}{YY}{code}{MM}{seq}` number inside `tx`.
///
/// The tenant's registered company code wins over `default_code`.
pub fn allocate(
    tx: &mut Transaction<'_>,
    tenant_id: TenantId,
    prefix: DocumentPrefix,
    default_code: &str,
    at: DateTime<Utc>,
) -> Result<String, WorkflowError> {
    let code = tx
        .company_code(tenant_id)
        .unwrap_or_else(|| default_code.to_string());
    let key = DocumentNumber::period_key(prefix, &code, at)?;
    let sequence = tx.next_sequence(tenant_id, &key);
    Ok(DocumentNumber::new(prefix, &code, at, sequence)?.to_string())
}
