//! Infrastructure layer: persistence collaborator, document numbering and the
//! workflow service that ties the domain crates together.

pub mod numbering;
pub mod store;
pub mod workflow;


pub use store::{InMemoryStore, Record, StoreError, Tables, Transaction, WorkflowStore};
pub use workflow::{
    NewLead, NewProduct, QuotationStatusUpdate, Receipt, WorkflowError, WorkflowResult, WorkflowService,
};
