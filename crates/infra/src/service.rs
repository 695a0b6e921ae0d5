//! Request entry points.
//!
//! Each method opens one unit of work, runs a single workflow in it and
//! commits only if the workflow succeeded. On any error the unit of work is
//! dropped, which discards every staged write.

use chrono::Utc;
use tracing::{instrument, warn};

use storeledger_accounting::{OperationRef, Page, Pagination, Transaction, TransactionFilter};
use storeledger_auth::Requester;
use storeledger_core::{
    DomainResult, OrderId, ProductId, RefundId, RemovalId, RestockId, StoreId, TransactionId,
};
use storeledger_inventory::{InventoryRecord, StockRemoval};
use storeledger_purchasing::{Restock, RestockStatus};
use storeledger_sales::{Order, OrderStatus, Refund};

use crate::config::LedgerConfig;
use crate::store::{Store, UnitOfWork};
use crate::workflows::RequestContext;
use crate::workflows::inventory::{self, AddInventory};
use crate::workflows::orders::{self, CartEdit, CreateOrder};
use crate::workflows::refunds::{self, CreateRefund, UpdateRefund};
use crate::workflows::removals::{self, CreateStockRemoval, UpdateStockRemoval};
use crate::workflows::restocks::{self, CreateRestock};
use crate::workflows::transactions;

#[derive(Debug)]
pub struct RetailService<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: Store> RetailService<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn run<'s, T, F>(&'s self, requester: Requester, operation: &'static str, f: F) -> DomainResult<T>
    where
        F: FnOnce(&mut S::Uow<'s>, &RequestContext<'_>) -> DomainResult<T>,
    {
        let ctx = RequestContext::new(requester, &self.config, Utc::now());
        let mut uow = self.store.begin()?;
        match f(&mut uow, &ctx) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!(
                    operation,
                    user_id = %requester.user_id,
                    kind = err.kind(),
                    error = %err,
                    "operation rejected"
                );
                Err(err)
            }
        }
    }

    // Orders

    #[instrument(skip_all, fields(store_id = %cmd.store_id, customer_id = %cmd.customer_id))]
    pub fn create_order(&self, requester: Requester, cmd: CreateOrder) -> DomainResult<Order> {
        self.run(requester, "create_order", |uow, ctx| {
            orders::create_order(uow, ctx, cmd)
        })
    }

    #[instrument(skip_all, fields(order_id = %order_id, status = %to))]
    pub fn update_order_status(
        &self,
        requester: Requester,
        order_id: OrderId,
        to: OrderStatus,
    ) -> DomainResult<Order> {
        self.run(requester, "update_order_status", |uow, ctx| {
            orders::update_order_status(uow, ctx, order_id, to)
        })
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    pub fn cancel_order(&self, requester: Requester, order_id: OrderId) -> DomainResult<Order> {
        self.run(requester, "cancel_order", |uow, ctx| {
            orders::cancel_order(uow, ctx, order_id)
        })
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    pub fn delete_order(&self, requester: Requester, order_id: OrderId) -> DomainResult<()> {
        self.run(requester, "delete_order", |uow, ctx| {
            orders::delete_order(uow, ctx, order_id)
        })
    }

    #[instrument(skip_all, fields(order_id = %order_id, edits = edits.len()))]
    pub fn edit_order_cart(
        &self,
        requester: Requester,
        order_id: OrderId,
        edits: &[CartEdit],
    ) -> DomainResult<Order> {
        self.run(requester, "edit_order_cart", |uow, ctx| {
            orders::edit_order_cart(uow, ctx, order_id, edits)
        })
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    pub fn get_order(&self, requester: Requester, order_id: OrderId) -> DomainResult<Order> {
        self.run(requester, "get_order", |uow, ctx| {
            orders::get_order(&*uow, ctx, order_id)
        })
    }

    #[instrument(skip_all, fields(store_id = %store_id))]
    pub fn list_orders(
        &self,
        requester: Requester,
        store_id: StoreId,
        pagination: Pagination,
    ) -> DomainResult<Page<Order>> {
        self.run(requester, "list_orders", |uow, ctx| {
            orders::list_orders(&*uow, ctx, store_id, pagination)
        })
    }

    // Refunds

    #[instrument(skip_all, fields(order_id = %cmd.order_id))]
    pub fn create_refund(&self, requester: Requester, cmd: CreateRefund) -> DomainResult<Refund> {
        self.run(requester, "create_refund", |uow, ctx| {
            refunds::create_refund(uow, ctx, cmd)
        })
    }

    #[instrument(skip_all, fields(refund_id = %refund_id))]
    pub fn update_refund(
        &self,
        requester: Requester,
        refund_id: RefundId,
        cmd: UpdateRefund,
    ) -> DomainResult<Refund> {
        self.run(requester, "update_refund", |uow, ctx| {
            refunds::update_refund(uow, ctx, refund_id, cmd)
        })
    }

    #[instrument(skip_all, fields(refund_id = %refund_id))]
    pub fn delete_refund(&self, requester: Requester, refund_id: RefundId) -> DomainResult<()> {
        self.run(requester, "delete_refund", |uow, ctx| {
            refunds::delete_refund(uow, ctx, refund_id)
        })
    }

    #[instrument(skip_all, fields(refund_id = %refund_id))]
    pub fn get_refund(&self, requester: Requester, refund_id: RefundId) -> DomainResult<Refund> {
        self.run(requester, "get_refund", |uow, ctx| {
            refunds::get_refund(&*uow, ctx, refund_id)
        })
    }

    #[instrument(skip_all, fields(store_id = %store_id))]
    pub fn list_refunds(
        &self,
        requester: Requester,
        store_id: StoreId,
        pagination: Pagination,
    ) -> DomainResult<Page<Refund>> {
        self.run(requester, "list_refunds", |uow, ctx| {
            refunds::list_refunds(&*uow, ctx, store_id, pagination)
        })
    }

    // Restocks

    #[instrument(skip_all, fields(store_id = %cmd.store_id))]
    pub fn create_restock(&self, requester: Requester, cmd: CreateRestock) -> DomainResult<Restock> {
        self.run(requester, "create_restock", |uow, ctx| {
            restocks::create_restock(uow, ctx, cmd)
        })
    }

    #[instrument(skip_all, fields(restock_id = %restock_id, status = %to))]
    pub fn update_restock_status(
        &self,
        requester: Requester,
        restock_id: RestockId,
        to: RestockStatus,
    ) -> DomainResult<Restock> {
        self.run(requester, "update_restock_status", |uow, ctx| {
            restocks::update_restock_status(uow, ctx, restock_id, to)
        })
    }

    #[instrument(skip_all, fields(restock_id = %restock_id))]
    pub fn delete_restock(&self, requester: Requester, restock_id: RestockId) -> DomainResult<()> {
        self.run(requester, "delete_restock", |uow, ctx| {
            restocks::delete_restock(uow, ctx, restock_id)
        })
    }

    #[instrument(skip_all, fields(restock_id = %restock_id))]
    pub fn get_restock(&self, requester: Requester, restock_id: RestockId) -> DomainResult<Restock> {
        self.run(requester, "get_restock", |uow, ctx| {
            restocks::get_restock(&*uow, ctx, restock_id)
        })
    }

    // Stock removals

    #[instrument(skip_all, fields(store_id = %cmd.store_id, reason = %cmd.reason))]
    pub fn create_stock_removal(
        &self,
        requester: Requester,
        cmd: CreateStockRemoval,
    ) -> DomainResult<StockRemoval> {
        self.run(requester, "create_stock_removal", |uow, ctx| {
            removals::create_stock_removal(uow, ctx, cmd)
        })
    }

    #[instrument(skip_all, fields(removal_id = %removal_id))]
    pub fn update_stock_removal(
        &self,
        requester: Requester,
        removal_id: RemovalId,
        cmd: UpdateStockRemoval,
    ) -> DomainResult<StockRemoval> {
        self.run(requester, "update_stock_removal", |uow, ctx| {
            removals::update_stock_removal(uow, ctx, removal_id, cmd)
        })
    }

    #[instrument(skip_all, fields(removal_id = %removal_id))]
    pub fn cancel_stock_removal(
        &self,
        requester: Requester,
        removal_id: RemovalId,
    ) -> DomainResult<StockRemoval> {
        self.run(requester, "cancel_stock_removal", |uow, ctx| {
            removals::cancel_stock_removal(uow, ctx, removal_id)
        })
    }

    #[instrument(skip_all, fields(removal_id = %removal_id))]
    pub fn delete_stock_removal(
        &self,
        requester: Requester,
        removal_id: RemovalId,
    ) -> DomainResult<()> {
        self.run(requester, "delete_stock_removal", |uow, ctx| {
            removals::delete_stock_removal(uow, ctx, removal_id)
        })
    }

    #[instrument(skip_all, fields(removal_id = %removal_id))]
    pub fn get_stock_removal(
        &self,
        requester: Requester,
        removal_id: RemovalId,
    ) -> DomainResult<StockRemoval> {
        self.run(requester, "get_stock_removal", |uow, ctx| {
            removals::get_stock_removal(&*uow, ctx, removal_id)
        })
    }

    // Inventory

    #[instrument(skip_all, fields(store_id = %cmd.store_id, product_id = %cmd.product_id))]
    pub fn add_inventory(
        &self,
        requester: Requester,
        cmd: AddInventory,
    ) -> DomainResult<InventoryRecord> {
        self.run(requester, "add_inventory", |uow, ctx| {
            inventory::add_inventory(uow, ctx, cmd)
        })
    }

    #[instrument(skip_all, fields(store_id = %store_id, product_id = %product_id))]
    pub fn get_inventory(
        &self,
        requester: Requester,
        store_id: StoreId,
        product_id: ProductId,
    ) -> DomainResult<InventoryRecord> {
        self.run(requester, "get_inventory", |uow, ctx| {
            inventory::get_inventory(&*uow, ctx, store_id, product_id)
        })
    }

    #[instrument(skip_all, fields(store_id = %store_id))]
    pub fn list_inventory(
        &self,
        requester: Requester,
        store_id: StoreId,
        pagination: Pagination,
    ) -> DomainResult<Page<InventoryRecord>> {
        self.run(requester, "list_inventory", |uow, ctx| {
            inventory::list_inventory(&*uow, ctx, store_id, pagination)
        })
    }

    // Ledger

    #[instrument(skip_all)]
    pub fn list_transactions(
        &self,
        requester: Requester,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> DomainResult<Page<Transaction>> {
        self.run(requester, "list_transactions", |uow, ctx| {
            transactions::list_transactions(&*uow, ctx, filter, pagination)
        })
    }

    #[instrument(skip_all, fields(transaction_id = %id))]
    pub fn get_transaction(
        &self,
        requester: Requester,
        id: TransactionId,
    ) -> DomainResult<Transaction> {
        self.run(requester, "get_transaction", |uow, ctx| {
            transactions::get_transaction(&*uow, ctx, id)
        })
    }

    #[instrument(skip_all, fields(operation = %operation))]
    pub fn transaction_for(
        &self,
        requester: Requester,
        operation: OperationRef,
    ) -> DomainResult<Option<Transaction>> {
        self.run(requester, "transaction_for", |uow, ctx| {
            transactions::transaction_for(&*uow, ctx, operation)
        })
    }
}
