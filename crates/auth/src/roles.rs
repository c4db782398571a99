//! Closed role vocabulary and the role → capability matrix.
//!
//! A user carries exactly one role. Hierarchy is not stored anywhere in the
//! data; it is expressed here, by listing for each role the departments it
//! belongs to and its seniority tier. Managers and the superuser are granted
//! whatever the staff role of their department(s) is granted.

use serde::{Deserialize, Serialize};

/// Business department a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Sales,
    Purchasing,
    Warehouse,
    Finance,
}

impl Department {
    pub const ALL: [Department; 4] = [
        Department::Sales,
        Department::Purchasing,
        Department::Warehouse,
        Department::Finance,
    ];
}

/// Seniority tier of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Staff,
    Manager,
    Superuser,
}

/// Role identifier used for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Sales,
    ManagerSales,
    Purchasing,
    ManagerPurchasing,
    Warehouse,
    ManagerWarehouse,
    Finance,
    ManagerFinance,
    Superuser,
}

/// One row of the capability matrix.
struct Capabilities {
    role: Role,
    name: &'static str,
    departments: &'static [Department],
    tier: Tier,
}

const CAPABILITY_MATRIX: [Capabilities; 9] = [
    Capabilities {
        role: Role::Sales,
        name: "sales",
        departments: &[Department::Sales],
        tier: Tier::Staff,
    },
    Capabilities {
        role: Role::ManagerSales,
        name: "manager-sales",
        departments: &[Department::Sales],
        tier: Tier::Manager,
    },
    Capabilities {
        role: Role::Purchasing,
        name: "purchasing",
        departments: &[Department::Purchasing],
        tier: Tier::Staff,
    },
    Capabilities {
        role: Role::ManagerPurchasing,
        name: "manager-purchasing",
        departments: &[Department::Purchasing],
        tier: Tier::Manager,
    },
    Capabilities {
        role: Role::Warehouse,
        name: "warehouse",
        departments: &[Department::Warehouse],
        tier: Tier::Staff,
    },
    Capabilities {
        role: Role::ManagerWarehouse,
        name: "manager-warehouse",
        departments: &[Department::Warehouse],
        tier: Tier::Manager,
    },
    Capabilities {
        role: Role::Finance,
        name: "finance",
        departments: &[Department::Finance],
        tier: Tier::Staff,
    },
    Capabilities {
        role: Role::ManagerFinance,
        name: "manager-finance",
        departments: &[Department::Finance],
        tier: Tier::Manager,
    },
    Capabilities {
        role: Role::Superuser,
        name: "superuser",
        departments: &Department::ALL,
        tier: Tier::Superuser,
    },
];

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Sales,
        Role::ManagerSales,
        Role::Purchasing,
        Role::ManagerPurchasing,
        Role::Warehouse,
        Role::ManagerWarehouse,
        Role::Finance,
        Role::ManagerFinance,
        Role::Superuser,
    ];

    fn capabilities(self) -> &'static Capabilities {
        // The matrix is declared in the same order as `Role::ALL`.
        &CAPABILITY_MATRIX[self as usize]
    }

    /// Parse a role name. Case-insensitive; `_` and `-` are interchangeable.
    /// Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Role> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        CAPABILITY_MATRIX
            .iter()
            .find(|row| row.name == normalized)
            .map(|row| row.role)
    }

    /// Canonical role name.
    pub fn as_str(self) -> &'static str {
        self.capabilities().name
    }

    pub fn departments(self) -> &'static [Department] {
        self.capabilities().departments
    }

    pub fn tier(self) -> Tier {
        self.capabilities().tier
    }

    pub fn in_department(self, department: Department) -> bool {
        self.departments().contains(&department)
    }

    /// Manager of `department`, or superuser.
    pub fn manages(self, department: Department) -> bool {
        match self.tier() {
            Tier::Superuser => true,
            Tier::Manager => self.in_department(department),
            Tier::Staff => false,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or_else(|| format!("unknown role '{value}'"))
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}
