use serde::{Deserialize, Serialize};

use orderflow_core::UserId;

use crate::Role;

/// Role as it appears on an identity payload.
///
/// Upstream identity sources are not consistent: some put the role name on the
/// user directly, others embed the role relation as an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleClaim {
    /// `"role": "manager-sales"`
    Name(String),
    /// `"role": { "name": "manager-sales" }`
    Relation { name: String },
}

impl RoleClaim {
    pub fn name(&self) -> &str {
        match self {
            RoleClaim::Name(name) => name,
            RoleClaim::Relation { name } => name,
        }
    }

    /// Resolve to a known role; unknown names resolve to `None`.
    pub fn resolve(&self) -> Option<Role> {
        Role::parse(self.name())
    }
}

impl From<Role> for RoleClaim {
    fn from(value: Role) -> Self {
        RoleClaim::Name(value.as_str().to_string())
    }
}

/// The authenticated user an action is performed on behalf of.
///
/// A user whose role claim is missing or unrecognised is still an acting user
/// (it has an id), but it holds no role and fails every capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: UserId,
    pub role: Option<Role>,
}

impl ActingUser {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role: Some(role),
        }
    }

    /// Build from a raw identity payload (user id + optional role claim).
    pub fn from_claim(id: UserId, claim: Option<&RoleClaim>) -> Self {
        Self {
            id,
            role: claim.and_then(RoleClaim::resolve),
        }
    }
}
