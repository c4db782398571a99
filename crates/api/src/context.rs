use orderflow_auth::ActingUser;
use orderflow_core::TenantId;

/// Tenant context for a request.
///
/// This is immutable and must be present for all domain routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (authenticated identity + resolved role).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user: ActingUser,
    /// Role name as it appeared on the token, resolvable or not.
    claimed_role: Option<String>,
}

impl PrincipalContext {
    pub fn new(user: ActingUser, claimed_role: Option<String>) -> Self {
        Self { user, claimed_role }
    }

    /// The acting user in the shape the workflow service takes.
    pub fn acting_user(&self) -> Option<&ActingUser> {
        Some(&self.user)
    }

    pub fn user(&self) -> ActingUser {
        self.user
    }

    pub fn claimed_role(&self) -> Option<&str> {
        self.claimed_role.as_deref()
    }
}
