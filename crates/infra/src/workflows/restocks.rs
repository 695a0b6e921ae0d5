//! Restock lifecycle.
//!
//! A restock is written to the ledger when it is placed but its quantities
//! only reach inventory when it is completed.

use serde::{Deserialize, Serialize};
use tracing::info;

use storeledger_accounting::{OperationRef, Transaction};
use storeledger_auth::Operation;
use storeledger_core::{
    AggregateRoot, DomainError, DomainResult, ExpectedVersion, ProductId, RestockId, StoreId,
};
use storeledger_inventory::{InventoryKey, increment, reverse, stock_delta};
use storeledger_purchasing::{Restock, RestockItem, RestockStatus};

use super::RequestContext;
use crate::store::UnitOfWork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRestock {
    pub store_id: StoreId,
    pub items: Vec<RestockLine>,
}

fn load_restock<U: UnitOfWork + ?Sized>(uow: &U, id: RestockId) -> DomainResult<Restock> {
    uow.restock(id)?
        .ok_or_else(|| DomainError::not_found(format!("restock {id}")))
}

pub fn create_restock<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    cmd: CreateRestock,
) -> DomainResult<Restock> {
    ctx.authorize(Operation::ManageRestock)?;

    let delta = stock_delta(cmd.items.iter().map(|l| (l.product_id, l.quantity)))?;

    let mut items = Vec::with_capacity(delta.len());
    for (&product_id, &restock_quantity) in &delta {
        if !uow.product(product_id)?.is_some_and(|p| p.can_be_sold()) {
            return Err(DomainError::not_found(format!("product {product_id}")));
        }
        let previous_quantity = uow
            .inventory(InventoryKey::new(cmd.store_id, product_id))?
            .map_or(0, |row| row.quantity());
        items.push(RestockItem {
            product_id,
            previous_quantity,
            restock_quantity,
        });
    }

    let restock = Restock::place(
        RestockId::new(),
        cmd.store_id,
        ctx.requester.user_id,
        ctx.now,
        items,
    )?;
    uow.save_restock(&restock, ExpectedVersion::NoAggregate)?;
    uow.append_transaction(Transaction::record(
        OperationRef::Restock(restock.id_typed()),
        restock.store_id(),
        ctx.requester.user_id,
        ctx.now,
    ))?;

    info!(
        operation = "create_restock",
        store_id = %restock.store_id(),
        restock_id = %restock.id_typed(),
        items = restock.items().len(),
        "restock placed"
    );
    Ok(restock)
}

/// Complete or cancel a restock.
///
/// Completing adds every item to inventory. Cancelling takes the items back
/// out only if they had been added.
pub fn update_restock_status<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    restock_id: RestockId,
    to: RestockStatus,
) -> DomainResult<Restock> {
    ctx.authorize(Operation::ManageRestock)?;

    let mut restock = load_restock(uow, restock_id)?;
    let expected = ExpectedVersion::Exact(restock.version());
    restock.ensure_transition(to)?;

    match to {
        RestockStatus::Completed => {
            let changes = increment(uow, restock.store_id(), &restock.stock_delta())?;
            restock.complete(ctx.now, &changes)?;
        }
        RestockStatus::Cancelled => {
            if restock.is_applied() {
                reverse(uow, restock.store_id(), &restock.stock_delta(), false)?;
            }
            restock.cancel()?;
        }
        RestockStatus::Pending => {}
    }
    uow.save_restock(&restock, expected)?;

    info!(
        operation = "update_restock_status",
        store_id = %restock.store_id(),
        restock_id = %restock_id,
        status = %restock.status(),
        "restock status updated"
    );
    Ok(restock)
}

pub fn delete_restock<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    restock_id: RestockId,
) -> DomainResult<()> {
    ctx.authorize(Operation::DeleteRestock)?;

    let restock = load_restock(uow, restock_id)?;
    if restock.is_applied() {
        reverse(uow, restock.store_id(), &restock.stock_delta(), false)?;
    }
    uow.delete_restock(restock_id)?;

    info!(
        operation = "delete_restock",
        store_id = %restock.store_id(),
        restock_id = %restock_id,
        reversed = restock.is_applied(),
        "restock deleted"
    );
    Ok(())
}

pub fn get_restock<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    restock_id: RestockId,
) -> DomainResult<Restock> {
    ctx.authorize(Operation::ManageRestock)?;
    load_restock(uow, restock_id)
}
