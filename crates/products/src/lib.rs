//! Product catalog (read side used by the conversion pipeline).
//!
//! Products are maintained by ordinary CRUD screens; this crate only models the
//! fields the workflow needs and the name lookup used when turning an
//! opportunity's product interest into quotation lines.

pub mod product;

pub use product::{Product, ProductCatalog, ProductId, ProductStatus};
