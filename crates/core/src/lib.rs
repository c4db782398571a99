//! `orderflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the shared error model, aggregate/entity/event traits and the
//! document number value object.

pub mod aggregate;
pub mod document;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use document::{COMPANY_CODE_LEN, DocumentNumber, DocumentPrefix, validate_company_code};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{CustomerId, RecordId, TenantId, UserId, VendorId};
pub use value_object::ValueObject;
