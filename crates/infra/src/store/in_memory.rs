use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

use storeledger_accounting::{OperationRef, Page, Pagination, Transaction, TransactionFilter};
use storeledger_core::{
    AggregateRoot, CustomerId, DomainError, DomainResult, ExpectedVersion, OrderId, ProductId,
    RefundId, RemovalId, RestockId, StoreId, TransactionId,
};
use storeledger_inventory::{InventoryKey, InventoryRecord, InventoryRows, StockRemoval};
use storeledger_parties::Customer;
use storeledger_products::Product;
use storeledger_purchasing::Restock;
use storeledger_sales::{Order, Refund};

use super::{Store, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    inventory: HashMap<InventoryKey, InventoryRecord>,
    orders: HashMap<OrderId, Order>,
    refunds: HashMap<RefundId, Refund>,
    restocks: HashMap<RestockId, Restock>,
    removals: HashMap<RemovalId, StockRemoval>,
    /// Append-only, in insertion order.
    transactions: Vec<Transaction>,
    operations: HashSet<OperationRef>,
}

/// Pending writes to one committed map. `None` marks a deletion.
#[derive(Debug)]
struct Overlay<K, V> {
    changes: HashMap<K, Option<V>>,
}

impl<K, V> Default for Overlay<K, V> {
    fn default() -> Self {
        Self {
            changes: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash, V> Overlay<K, V> {
    fn get<'s>(&'s self, base: &'s HashMap<K, V>, key: &K) -> Option<&'s V> {
        match self.changes.get(key) {
            Some(change) => change.as_ref(),
            None => base.get(key),
        }
    }

    fn values<'s>(&'s self, base: &'s HashMap<K, V>) -> impl Iterator<Item = &'s V> + 's {
        base.iter()
            .filter(move |(key, _)| !self.changes.contains_key(*key))
            .map(|(_, value)| value)
            .chain(self.changes.values().filter_map(Option::as_ref))
    }

    fn insert(&mut self, key: K, value: V) {
        self.changes.insert(key, Some(value));
    }

    /// Stage a deletion. Returns false when there was nothing to delete.
    fn remove(&mut self, base: &HashMap<K, V>, key: K) -> bool {
        if self.get(base, &key).is_none() {
            return false;
        }
        self.changes.insert(key, None);
        true
    }

    fn apply(self, base: &mut HashMap<K, V>) {
        for (key, change) in self.changes {
            match change {
                Some(value) => {
                    base.insert(key, value);
                }
                None => {
                    base.remove(&key);
                }
            }
        }
    }
}

/// Everything a unit of work has written but not committed.
#[derive(Debug, Default)]
struct Staged {
    inventory: Overlay<InventoryKey, InventoryRecord>,
    orders: Overlay<OrderId, Order>,
    refunds: Overlay<RefundId, Refund>,
    restocks: Overlay<RestockId, Restock>,
    removals: Overlay<RemovalId, StockRemoval>,
    transactions: Vec<Transaction>,
}

/// In-memory transactional store.
///
/// Units of work are serialised behind one lock. Writes are staged as an
/// overlay on top of the committed state and merged into it on commit, so
/// starting a unit of work copies nothing.
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Register a catalog product. Catalog maintenance lives outside the ledger.
    pub fn insert_product(&self, product: Product) -> DomainResult<()> {
        let mut state = self.lock()?;
        state.products.insert(product.id(), product);
        Ok(())
    }

    /// Register a customer record. Customer maintenance lives outside the ledger.
    pub fn insert_customer(&self, customer: Customer) -> DomainResult<()> {
        let mut state = self.lock()?;
        state.customers.insert(customer.id(), customer);
        Ok(())
    }
}

impl Store for InMemoryStore {
    type Uow<'a>
        = InMemoryUnitOfWork<'a>
    where
        Self: 'a;

    fn begin(&self) -> DomainResult<Self::Uow<'_>> {
        let committed = self.lock()?;
        Ok(InMemoryUnitOfWork {
            committed,
            staged: Staged::default(),
        })
    }
}

/// Unit of work over [`InMemoryStore`]. Holds the store lock until dropped.
pub struct InMemoryUnitOfWork<'a> {
    committed: MutexGuard<'a, State>,
    staged: Staged,
}

impl core::fmt::Debug for InMemoryUnitOfWork<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryUnitOfWork").finish_non_exhaustive()
    }
}

impl InMemoryUnitOfWork<'_> {
    fn all_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.committed
            .transactions
            .iter()
            .chain(self.staged.transactions.iter())
    }
}

fn check_version(
    expected: ExpectedVersion,
    actual: Option<u64>,
    what: impl core::fmt::Display,
) -> DomainResult<()> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(StoreError::Concurrency(format!(
            "{what}: expected {expected:?}, found {actual:?}"
        ))
        .into())
    }
}

fn save<K, V>(
    overlay: &mut Overlay<K, V>,
    base: &HashMap<K, V>,
    value: &V,
    expected: ExpectedVersion,
    what: &str,
) -> DomainResult<()>
where
    K: Copy + Eq + Hash + core::fmt::Display,
    V: AggregateRoot<Id = K> + Clone,
{
    let id = *value.id();
    let actual = overlay.get(base, &id).map(AggregateRoot::version);
    check_version(expected, actual, format_args!("{what} {id}"))?;
    overlay.insert(id, value.clone());
    Ok(())
}

fn delete<K, V>(
    overlay: &mut Overlay<K, V>,
    base: &HashMap<K, V>,
    id: K,
    what: &str,
) -> DomainResult<()>
where
    K: Copy + Eq + Hash + core::fmt::Display,
{
    if overlay.remove(base, id) {
        Ok(())
    } else {
        Err(DomainError::not_found(format!("{what} {id}")))
    }
}

/// Sort newest first by `key`, then page.
fn newest_first<T, K: Ord>(
    mut items: Vec<T>,
    key: impl Fn(&T) -> K,
    pagination: Pagination,
) -> Page<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    pagination.page(items)
}

impl InventoryRows for InMemoryUnitOfWork<'_> {
    fn inventory(&self, key: InventoryKey) -> DomainResult<Option<InventoryRecord>> {
        Ok(self
            .staged
            .inventory
            .get(&self.committed.inventory, &key)
            .cloned())
    }

    fn put_inventory(&mut self, record: InventoryRecord) -> DomainResult<()> {
        let key = record.key();
        check_version(
            ExpectedVersion::after_change(record.version()),
            self.staged
                .inventory
                .get(&self.committed.inventory, &key)
                .map(AggregateRoot::version),
            format_args!("inventory {key}"),
        )?;
        self.staged.inventory.insert(key, record);
        Ok(())
    }
}

impl UnitOfWork for InMemoryUnitOfWork<'_> {
    fn product(&self, id: ProductId) -> DomainResult<Option<Product>> {
        Ok(self.committed.products.get(&id).cloned())
    }

    fn customer(&self, id: CustomerId) -> DomainResult<Option<Customer>> {
        Ok(self.committed.customers.get(&id).cloned())
    }

    fn inventory_in_store(
        &self,
        store_id: StoreId,
        pagination: Pagination,
    ) -> DomainResult<Page<InventoryRecord>> {
        let mut rows: Vec<InventoryRecord> = self
            .staged
            .inventory
            .values(&self.committed.inventory)
            .filter(|r| r.store_id() == store_id)
            .cloned()
            .collect();
        rows.sort_by_key(InventoryRecord::product_id);
        Ok(pagination.page(rows))
    }

    fn order(&self, id: OrderId) -> DomainResult<Option<Order>> {
        Ok(self.staged.orders.get(&self.committed.orders, &id).cloned())
    }

    fn orders(&self, store_id: StoreId, pagination: Pagination) -> DomainResult<Page<Order>> {
        let orders = self
            .staged
            .orders
            .values(&self.committed.orders)
            .filter(|o| o.store_id() == store_id)
            .cloned()
            .collect();
        Ok(newest_first(
            orders,
            |o: &Order| (o.date_placed(), o.id_typed()),
            pagination,
        ))
    }

    fn save_order(&mut self, order: &Order, expected: ExpectedVersion) -> DomainResult<()> {
        save(
            &mut self.staged.orders,
            &self.committed.orders,
            order,
            expected,
            "order",
        )
    }

    fn delete_order(&mut self, id: OrderId) -> DomainResult<()> {
        delete(&mut self.staged.orders, &self.committed.orders, id, "order")
    }

    fn refund(&self, id: RefundId) -> DomainResult<Option<Refund>> {
        Ok(self.staged.refunds.get(&self.committed.refunds, &id).cloned())
    }

    fn refunds(&self, store_id: StoreId, pagination: Pagination) -> DomainResult<Page<Refund>> {
        let refunds = self
            .staged
            .refunds
            .values(&self.committed.refunds)
            .filter(|r| r.store_id() == store_id)
            .cloned()
            .collect();
        Ok(newest_first(
            refunds,
            |r: &Refund| (r.application_date(), r.id_typed()),
            pagination,
        ))
    }

    fn refunds_for_order(&self, order_id: OrderId) -> DomainResult<Vec<Refund>> {
        Ok(self
            .staged
            .refunds
            .values(&self.committed.refunds)
            .filter(|r| r.order_id() == order_id)
            .cloned()
            .collect())
    }

    fn save_refund(&mut self, refund: &Refund, expected: ExpectedVersion) -> DomainResult<()> {
        save(
            &mut self.staged.refunds,
            &self.committed.refunds,
            refund,
            expected,
            "refund",
        )
    }

    fn delete_refund(&mut self, id: RefundId) -> DomainResult<()> {
        delete(&mut self.staged.refunds, &self.committed.refunds, id, "refund")
    }

    fn restock(&self, id: RestockId) -> DomainResult<Option<Restock>> {
        Ok(self
            .staged
            .restocks
            .get(&self.committed.restocks, &id)
            .cloned())
    }

    fn save_restock(&mut self, restock: &Restock, expected: ExpectedVersion) -> DomainResult<()> {
        save(
            &mut self.staged.restocks,
            &self.committed.restocks,
            restock,
            expected,
            "restock",
        )
    }

    fn delete_restock(&mut self, id: RestockId) -> DomainResult<()> {
        delete(
            &mut self.staged.restocks,
            &self.committed.restocks,
            id,
            "restock",
        )
    }

    fn removal(&self, id: RemovalId) -> DomainResult<Option<StockRemoval>> {
        Ok(self
            .staged
            .removals
            .get(&self.committed.removals, &id)
            .cloned())
    }

    fn save_removal(
        &mut self,
        removal: &StockRemoval,
        expected: ExpectedVersion,
    ) -> DomainResult<()> {
        save(
            &mut self.staged.removals,
            &self.committed.removals,
            removal,
            expected,
            "stock removal",
        )
    }

    fn delete_removal(&mut self, id: RemovalId) -> DomainResult<()> {
        delete(
            &mut self.staged.removals,
            &self.committed.removals,
            id,
            "stock removal",
        )
    }

    fn transaction(&self, id: TransactionId) -> DomainResult<Option<Transaction>> {
        Ok(self.all_transactions().find(|t| t.id() == id).cloned())
    }

    fn transaction_for(&self, operation: OperationRef) -> DomainResult<Option<Transaction>> {
        Ok(self
            .all_transactions()
            .find(|t| t.operation() == operation)
            .cloned())
    }

    fn transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> DomainResult<Page<Transaction>> {
        Ok(filter.select(self.all_transactions(), pagination))
    }

    fn append_transaction(&mut self, transaction: Transaction) -> DomainResult<()> {
        let operation = transaction.operation();
        let recorded = self.committed.operations.contains(&operation)
            || self
                .staged
                .transactions
                .iter()
                .any(|t| t.operation() == operation);
        if recorded {
            return Err(StoreError::Duplicate(format!(
                "a transaction already exists for {operation}"
            ))
            .into());
        }
        self.staged.transactions.push(transaction);
        Ok(())
    }

    fn commit(self) -> DomainResult<()> {
        let InMemoryUnitOfWork {
            mut committed,
            staged,
        } = self;
        let state = &mut *committed;
        staged.inventory.apply(&mut state.inventory);
        staged.orders.apply(&mut state.orders);
        staged.refunds.apply(&mut state.refunds);
        staged.restocks.apply(&mut state.restocks);
        staged.removals.apply(&mut state.removals);
        for transaction in staged.transactions {
            state.operations.insert(transaction.operation());
            state.transactions.push(transaction);
        }
        Ok(())
    }
}
