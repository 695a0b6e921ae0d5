//! Transactional storage boundary.
//!
//! Workflows see storage only through a [`UnitOfWork`]: every read and write of
//! one operation goes through the same handle, and nothing becomes visible to
//! other requests until [`UnitOfWork::commit`] succeeds. Dropping an
//! uncommitted unit of work discards all of its writes.

pub mod in_memory;

use thiserror::Error;

use storeledger_accounting::{OperationRef, Page, Pagination, Transaction, TransactionFilter};
use storeledger_core::{
    CustomerId, DomainError, DomainResult, ExpectedVersion, OrderId, ProductId, RefundId,
    RemovalId, RestockId, StoreId, TransactionId,
};
use storeledger_inventory::{InventoryRecord, InventoryRows, StockRemoval};
use storeledger_parties::Customer;
use storeledger_products::Product;
use storeledger_purchasing::Restock;
use storeledger_sales::{Order, Refund};

pub use in_memory::{InMemoryStore, InMemoryUnitOfWork};

/// Storage operation error.
///
/// These are infrastructure failures, as opposed to business rule
/// violations. They reach callers as [`DomainError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) | StoreError::Duplicate(msg) => DomainError::conflict(msg),
            StoreError::Unavailable(msg) => DomainError::unavailable(msg),
        }
    }
}

/// A source of units of work.
pub trait Store: Send + Sync {
    type Uow<'a>: UnitOfWork
    where
        Self: 'a;

    /// Start a unit of work. Blocks while another one is in flight.
    fn begin(&self) -> DomainResult<Self::Uow<'_>>;
}

/// One atomic operation against the store.
///
/// `save_*` calls check the stored version against `expected` and fail with
/// `Conflict` on mismatch. `delete_*` calls fail with `NotFound` when the
/// record is absent.
pub trait UnitOfWork: InventoryRows {
    fn product(&self, id: ProductId) -> DomainResult<Option<Product>>;

    fn customer(&self, id: CustomerId) -> DomainResult<Option<Customer>>;

    fn inventory_in_store(
        &self,
        store_id: StoreId,
        pagination: Pagination,
    ) -> DomainResult<Page<InventoryRecord>>;

    fn order(&self, id: OrderId) -> DomainResult<Option<Order>>;

    /// Newest first.
    fn orders(&self, store_id: StoreId, pagination: Pagination) -> DomainResult<Page<Order>>;

    fn save_order(&mut self, order: &Order, expected: ExpectedVersion) -> DomainResult<()>;

    fn delete_order(&mut self, id: OrderId) -> DomainResult<()>;

    fn refund(&self, id: RefundId) -> DomainResult<Option<Refund>>;

    /// Newest application first.
    fn refunds(&self, store_id: StoreId, pagination: Pagination) -> DomainResult<Page<Refund>>;

    /// Every refund raised against `order_id`, in no particular order.
    fn refunds_for_order(&self, order_id: OrderId) -> DomainResult<Vec<Refund>>;

    fn save_refund(&mut self, refund: &Refund, expected: ExpectedVersion) -> DomainResult<()>;

    fn delete_refund(&mut self, id: RefundId) -> DomainResult<()>;

    fn restock(&self, id: RestockId) -> DomainResult<Option<Restock>>;

    fn save_restock(&mut self, restock: &Restock, expected: ExpectedVersion) -> DomainResult<()>;

    fn delete_restock(&mut self, id: RestockId) -> DomainResult<()>;

    fn removal(&self, id: RemovalId) -> DomainResult<Option<StockRemoval>>;

    fn save_removal(
        &mut self,
        removal: &StockRemoval,
        expected: ExpectedVersion,
    ) -> DomainResult<()>;

    fn delete_removal(&mut self, id: RemovalId) -> DomainResult<()>;

    fn transaction(&self, id: TransactionId) -> DomainResult<Option<Transaction>>;

    fn transaction_for(&self, operation: OperationRef) -> DomainResult<Option<Transaction>>;

    fn transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> DomainResult<Page<Transaction>>;

    /// Append to the ledger. At most one transaction per operation.
    fn append_transaction(&mut self, transaction: Transaction) -> DomainResult<()>;

    /// Publish every write made through this handle.
    fn commit(self) -> DomainResult<()>
    where
        Self: Sized;
}
