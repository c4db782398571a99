//! Role Classifier: boolean capability checks over an (optional) acting user.
//!
//! All predicates are fail-closed: no user, or a user without a recognised
//! role, yields `false` everywhere. Broader roles satisfy narrower checks
//! (`is_sales` holds for sales, manager-sales and superuser).

use crate::{ActingUser, Department, Role};

fn role_of(user: Option<&ActingUser>) -> Option<Role> {
    user.and_then(|u| u.role)
}

/// Member of `department` (staff, manager or superuser).
pub fn in_department(user: Option<&ActingUser>, department: Department) -> bool {
    role_of(user).is_some_and(|r| r.in_department(department))
}

/// Manager of `department`, or superuser.
pub fn manages(user: Option<&ActingUser>, department: Department) -> bool {
    role_of(user).is_some_and(|r| r.manages(department))
}

pub fn is_superuser(user: Option<&ActingUser>) -> bool {
    role_of(user) == Some(Role::Superuser)
}

pub fn is_sales(user: Option<&ActingUser>) -> bool {
    in_department(user, Department::Sales)
}

pub fn is_manager_sales(user: Option<&ActingUser>) -> bool {
    manages(user, Department::Sales)
}

pub fn is_purchasing(user: Option<&ActingUser>) -> bool {
    in_department(user, Department::Purchasing)
}

pub fn is_manager_purchasing(user: Option<&ActingUser>) -> bool {
    manages(user, Department::Purchasing)
}

pub fn is_warehouse(user: Option<&ActingUser>) -> bool {
    in_department(user, Department::Warehouse)
}

pub fn is_manager_warehouse(user: Option<&ActingUser>) -> bool {
    manages(user, Department::Warehouse)
}

pub fn is_finance(user: Option<&ActingUser>) -> bool {
    in_department(user, Department::Finance)
}

pub fn is_manager_finance(user: Option<&ActingUser>) -> bool {
    manages(user, Department::Finance)
}

/// Exactly the given role (no hierarchy applied).
pub fn has_role(user: Option<&ActingUser>, role: Role) -> bool {
    role_of(user) == Some(role)
}
