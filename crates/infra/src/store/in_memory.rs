use std::sync::RwLock;

use super::{StoreError, Tables, Transaction, WorkflowStore};

/// In-memory transactional store.
///
/// Transactions are serialized under the write lock and run against a staged
/// copy of the tables, which replaces the committed state only when the
/// closure succeeds. Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for InMemoryStore {
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut committed = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let mut staged = committed.clone();
        let out = f(&mut Transaction::new(&mut staged))?;
        *committed = staged;
        Ok(out)
    }

    fn snapshot<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Tables) -> T,
    {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_core::TenantId;
    use orderflow_products::{Product, ProductId, ProductStatus};

    fn product(tenant_id: TenantId, id: i64, name: &str) -> Product {
        Product {
            id: ProductId::new(id),
            tenant_id,
            sku: format!("SKU-{id}"),
            name: name.to_string(),
            status: ProductStatus::Active,
            unit_price: 100,
        }
    }

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();

        let result: Result<(), StoreError> = store.transact(|tx| {
            tx.insert(product(tenant, 1, "Valve"))?;
            tx.next_sequence(tenant, "SQ260101");
            Err(StoreError::Poisoned)
        });
        assert!(result.is_err());

        let (count, next) = store
            .transact::<_, StoreError, _>(|tx| {
                Ok((tx.list::<Product>(tenant).len(), tx.next_sequence(tenant, "SQ260101")))
            })
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(next, 1);
    }

    #[test]
    fn ids_are_allocated_past_inserted_rows() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let id = store
            .transact::<_, StoreError, _>(|tx| {
                tx.insert(product(tenant, 41, "Valve"))?;
                Ok(tx.next_id::<Product>())
            })
            .unwrap();
        assert_eq!(id, ProductId::new(42));
    }

    #[test]
    fn tenants_do_not_see_each_other() {
        let store = InMemoryStore::new();
        let (a, b) = (TenantId::new(), TenantId::new());
        store
            .transact::<_, StoreError, _>(|tx| {
                tx.insert(product(a, 1, "Valve"))?;
                tx.insert(product(b, 1, "Pipe"))
            })
            .unwrap();

        let names = store
            .snapshot(|t| t.list::<Product>(a).iter().map(|p| p.name.clone()).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(names, vec!["Valve".to_string()]);
        assert!(store.snapshot(|t| t.find::<Product>(b, ProductId::new(2)).is_none()).unwrap());
    }

    #[test]
    fn update_requires_an_existing_row() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new();
        let err = store
            .transact::<(), StoreError, _>(|tx| tx.update(product(tenant, 7, "Valve")))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "product", .. }));
    }
}
