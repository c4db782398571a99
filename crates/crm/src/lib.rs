//! CRM records upstream of the sales order: leads (which become opportunities
//! by reaching an opportunity-stage status) and sales quotations.
//!
//! Pure domain logic; persistence and the conversions that create records
//! across crates live in `orderflow-infra`.

pub mod lead;
pub mod quotation;

pub use lead::{Lead, LeadId, LeadStatus, can_convert_opportunity_to_sq};
pub use quotation::{Quotation, QuotationId, QuotationItem, QuotationStage, QuotationStatus};
