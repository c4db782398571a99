//! Entity trait: identity + continuity across state changes.

use crate::TenantId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Tenant that owns the entity.
    fn tenant_id(&self) -> TenantId;
}
