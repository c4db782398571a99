//! Ownership Guard.
//!
//! Decides whether an acting user may see (and therefore act on) a record.
//! A denial is reported as [`DomainError::NotFound`], exactly like a missing
//! record, so unauthorized callers cannot probe for existence.

use serde::Serialize;

use orderflow_core::{DomainError, DomainResult, UserId};

use crate::classifier::{
    is_finance, is_manager_sales, is_purchasing, is_sales, is_superuser, is_warehouse,
};
use crate::ActingUser;

/// Kind of guarded record; each kind has its own visibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Leads and opportunities (one record type at different statuses).
    Lead,
    Quotation,
    SalesOrder,
}

/// A record with a single owning user and an optional co-owner.
pub trait OwnedRecord {
    fn record_kind(&self) -> RecordKind;

    /// User that created the record.
    fn owner_id(&self) -> UserId;

    /// Secondary owner (only meaningful for leads).
    fn assignee_id(&self) -> Option<UserId> {
        None
    }
}

/// Pure visibility decision.
pub fn can_access<R: OwnedRecord + ?Sized>(record: &R, user: &ActingUser) -> bool {
    let u = Some(user);
    if is_superuser(u) || is_manager_sales(u) {
        return true;
    }

    let owns = record.owner_id() == user.id;
    match record.record_kind() {
        RecordKind::Lead => {
            is_sales(u) && (owns || record.assignee_id() == Some(user.id))
        }
        RecordKind::Quotation => owns,
        RecordKind::SalesOrder => {
            // Every downstream department reads every order.
            is_purchasing(u) || is_finance(u) || is_warehouse(u) || (is_sales(u) && owns)
        }
    }
}

/// Authorize access to `record`.
///
/// - no acting user → `Unauthorized`
/// - acting user without access → `NotFound`
pub fn check_ownership<R: OwnedRecord + ?Sized>(
    record: &R,
    user: Option<&ActingUser>,
) -> DomainResult<()> {
    let user = user.ok_or(DomainError::Unauthorized)?;
    if can_access(record, user) {
        Ok(())
    } else {
        tracing::debug!(
            kind = ?record.record_kind(),
            user_id = %user.id,
            role = ?user.role,
            "ownership check denied; reporting not found"
        );
        Err(DomainError::NotFound)
    }
}
