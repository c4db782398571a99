//! `orderflow-auth`: pure authentication/authorization boundary.
//!
//! Role classification, the acting principal, record ownership checks and
//! bearer-token claims. Decoupled from HTTP and storage.

pub mod claims;
pub mod classifier;
pub mod guard;
pub mod principal;
pub mod roles;

pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use guard::{OwnedRecord, RecordKind, can_access, check_ownership};
pub use principal::{ActingUser, RoleClaim};
pub use roles::{Department, Role, Tier};
