//! Persistence collaborator.
//!
//! Records are kept per tenant in typed tables. Every write goes through
//! [`WorkflowStore::transact`]: the closure sees a [`Transaction`] and either
//! all of its writes are committed or none are.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use orderflow_core::{DocumentNumber, Entity, RecordId, TenantId};
use orderflow_crm::{Lead, LeadId, Quotation, QuotationId};
use orderflow_products::{Product, ProductId};
use orderflow_purchasing::{PurchaseOrder, PurchaseOrderId};
use orderflow_sales::{SalesOrder, SalesOrderId};

pub mod in_memory;

pub use in_memory::InMemoryStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: RecordId },

    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: RecordId },

    #[error("{kind} number {number} is already taken")]
    DuplicateNumber { kind: &'static str, number: String },

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Duplicate { .. } | StoreError::DuplicateNumber { .. } => "conflict",
            StoreError::Poisoned => "store_unavailable",
        }
    }
}

/// A row type the store knows how to keep.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + From<RecordId> + Into<RecordId>;

    const KIND: &'static str;

    fn record_id(&self) -> Self::Id;

    fn tenant(&self) -> TenantId;

    /// Generated document number, unique per tenant and kind.
    fn document_number(&self) -> Option<&str> {
        None
    }

    fn table(tables: &Tables) -> &Table<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;
}

/// Rows of one kind, keyed by (tenant, id).
#[derive(Debug, Clone)]
pub struct Table<R> {
    rows: BTreeMap<(TenantId, RecordId), R>,
    last_id: i64,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<R: Record> Table<R> {
    fn tenant_rows(&self, tenant_id: TenantId) -> impl Iterator<Item = &R> {
        self.rows
            .range((tenant_id, RecordId::new(i64::MIN))..=(tenant_id, RecordId::new(i64::MAX)))
            .map(|(_, row)| row)
    }
}

/// Complete store state. Cloned to stage a transaction.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    leads: Table<Lead>,
    quotations: Table<Quotation>,
    sales_orders: Table<SalesOrder>,
    purchase_orders: Table<PurchaseOrder>,
    products: Table<Product>,
    companies: BTreeMap<TenantId, String>,
    sequences: BTreeMap<(TenantId, String), u32>,
}

impl Tables {
    pub fn find<R: Record>(&self, tenant_id: TenantId, id: R::Id) -> Option<&R> {
        let id: RecordId = id.into();
        R::table(self).rows.get(&(tenant_id, id))
    }

    pub fn load<R: Record>(&self, tenant_id: TenantId, id: R::Id) -> Result<&R, StoreError> {
        let id: RecordId = id.into();
        R::table(self)
            .rows
            .get(&(tenant_id, id))
            .ok_or(StoreError::NotFound { kind: R::KIND, id })
    }

    pub fn list<R: Record>(&self, tenant_id: TenantId) -> Vec<&R> {
        R::table(self).tenant_rows(tenant_id).collect()
    }

    pub fn company_code(&self, tenant_id: TenantId) -> Option<&str> {
        self.companies.get(&tenant_id).map(String::as_str)
    }

    fn highest_sequence(&self, tenant_id: TenantId, period_key: &str) -> u32 {
        let numbers = self
            .quotations
            .tenant_rows(tenant_id)
            .filter_map(|row| row.document_number())
            .chain(self.sales_orders.tenant_rows(tenant_id).filter_map(|row| row.document_number()))
            .chain(
                self.purchase_orders
                    .tenant_rows(tenant_id)
                    .filter_map(|row| row.document_number()),
            );
        numbers
            .filter_map(|n| DocumentNumber::sequence_in_period(n, period_key))
            .max()
            .unwrap_or(0)
    }
}

/// Writable view handed to a transaction closure.
pub struct Transaction<'a> {
    tables: &'a mut Tables,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(tables: &'a mut Tables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &Tables {
        &*self.tables
    }

    /// Owned copy of a row, ready to be mutated and written back.
    pub fn load<R: Record>(&self, tenant_id: TenantId, id: R::Id) -> Result<R, StoreError> {
        self.tables.load::<R>(tenant_id, id).cloned()
    }

    pub fn find<R: Record>(&self, tenant_id: TenantId, id: R::Id) -> Option<R> {
        self.tables.find::<R>(tenant_id, id).cloned()
    }

    pub fn list<R: Record>(&self, tenant_id: TenantId) -> Vec<R> {
        self.tables.list::<R>(tenant_id).into_iter().cloned().collect()
    }

    pub fn next_id<R: Record>(&mut self) -> R::Id {
        let table = R::table_mut(self.tables);
        table.last_id += 1;
        <R::Id as From<RecordId>>::from(RecordId::new(table.last_id))
    }

    pub fn insert<R: Record>(&mut self, record: R) -> Result<(), StoreError> {
        let tenant_id = record.tenant();
        let id: RecordId = record.record_id().into();
        let table = R::table_mut(self.tables);
        if table.rows.contains_key(&(tenant_id, id)) {
            return Err(StoreError::Duplicate { kind: R::KIND, id });
        }
        if let Some(number) = record.document_number() {
            if table
                .tenant_rows(tenant_id)
                .any(|row| row.document_number() == Some(number))
            {
                return Err(StoreError::DuplicateNumber {
                    kind: R::KIND,
                    number: number.to_string(),
                });
            }
        }
        table.last_id = table.last_id.max(id.get());
        table.rows.insert((tenant_id, id), record);
        Ok(())
    }

    pub fn update<R: Record>(&mut self, record: R) -> Result<(), StoreError> {
        let key: (TenantId, RecordId) = (record.tenant(), record.record_id().into());
        let table = R::table_mut(self.tables);
        match table.rows.get_mut(&key) {
            Some(row) => {
                *row = record;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                kind: R::KIND,
                id: key.1,
            }),
        }
    }

    pub fn company_code(&self, tenant_id: TenantId) -> Option<String> {
        self.tables.company_code(tenant_id).map(str::to_string)
    }

    pub fn set_company_code(&mut self, tenant_id: TenantId, code: impl Into<String>) {
        self.tables.companies.insert(tenant_id, code.into());
    }

    /// Next sequence number for `period_key`.
    ///
    /// The counter starts from the highest number already stored for the key,
    /// so documents imported before the counter existed are never reused.
    pub fn next_sequence(&mut self, tenant_id: TenantId, period_key: &str) -> u32 {
        let current = match self.tables.sequences.get(&(tenant_id, period_key.to_string())) {
            Some(n) => *n,
            None => self.tables.highest_sequence(tenant_id, period_key),
        };
        let next = current + 1;
        self.tables
            .sequences
            .insert((tenant_id, period_key.to_string()), next);
        next
    }
}

/// Transactional persistence for the workflow.
pub trait WorkflowStore: Send + Sync {
    /// Run `f` as one unit: its writes are visible afterwards only if it
    /// returns `Ok`.
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>;

    /// Read-only access to committed state.
    fn snapshot<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Tables) -> T;
}

impl<S> WorkflowStore for Arc<S>
where
    S: WorkflowStore + ?Sized,
{
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        (**self).transact(f)
    }

    fn snapshot<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Tables) -> T,
    {
        (**self).snapshot(f)
    }
}

macro_rules! record_table {
    ($record:ty, $id:ty, $kind:literal, $field:ident) => {
        record_table!($record, $id, $kind, $field, |_row| None);
    };
    ($record:ty, $id:ty, $kind:literal, $field:ident, |$row:ident| $number:expr) => {
        impl Record for $record {
            type Id = $id;

            const KIND: &'static str = $kind;

            fn record_id(&self) -> $id {
                <$record as Entity>::id(self)
            }

            fn tenant(&self) -> TenantId {
                <$record as Entity>::tenant_id(self)
            }

            fn document_number(&self) -> Option<&str> {
                let $row = self;
                $number
            }

            fn table(tables: &Tables) -> &Table<Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
                &mut tables.$field
            }
        }
    };
}

record_table!(Lead, LeadId, "lead", leads);
record_table!(Quotation, QuotationId, "quotation", quotations, |row| Some(row.number.as_str()));
record_table!(SalesOrder, SalesOrderId, "sales_order", sales_orders, |row| Some(row.number()));
record_table!(PurchaseOrder, PurchaseOrderId, "purchase_order", purchase_orders, |row| Some(
    row.number.as_str()
));
record_table!(Product, ProductId, "product", products);
