//! Stock removal lifecycle. Stock leaves inventory as soon as a removal is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use storeledger_accounting::{OperationRef, Transaction};
use storeledger_auth::Operation;
use storeledger_core::{
    AggregateRoot, DomainError, DomainResult, ExpectedVersion, ProductId, RemovalId, StoreId,
};
use storeledger_inventory::{
    InventoryKey, RemovalReason, StockRemoval, decrement, reverse, stock_delta,
};

use super::RequestContext;
use crate::store::UnitOfWork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStockRemoval {
    pub store_id: StoreId,
    pub reason: RemovalReason,
    /// Defaults to the time of the request.
    pub date: Option<DateTime<Utc>>,
    pub items: Vec<RemovalLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStockRemoval {
    pub reason: Option<RemovalReason>,
    pub date: Option<DateTime<Utc>>,
    /// `Some(true)` cancels the removal and returns its stock.
    pub is_cancelled: Option<bool>,
}

fn load_removal<U: UnitOfWork + ?Sized>(uow: &U, id: RemovalId) -> DomainResult<StockRemoval> {
    uow.removal(id)?
        .ok_or_else(|| DomainError::not_found(format!("stock removal {id}")))
}

pub fn create_stock_removal<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    cmd: CreateStockRemoval,
) -> DomainResult<StockRemoval> {
    ctx.authorize(Operation::ManageRemoval)?;

    let delta = stock_delta(cmd.items.iter().map(|l| (l.product_id, l.quantity)))?;
    for &product_id in delta.keys() {
        let key = InventoryKey::new(cmd.store_id, product_id);
        if uow.inventory(key)?.is_none() {
            return Err(DomainError::not_found(format!("inventory for {key}")));
        }
    }

    let changes = decrement(uow, cmd.store_id, &delta)?;
    let removal = StockRemoval::record(
        RemovalId::new(),
        cmd.store_id,
        cmd.reason,
        cmd.date.unwrap_or(ctx.now),
        ctx.requester.user_id,
        &changes,
    )?;
    uow.save_removal(&removal, ExpectedVersion::NoAggregate)?;
    uow.append_transaction(Transaction::record(
        OperationRef::Removal(removal.id_typed()),
        removal.store_id(),
        ctx.requester.user_id,
        ctx.now,
    ))?;

    info!(
        operation = "create_stock_removal",
        store_id = %removal.store_id(),
        removal_id = %removal.id_typed(),
        reason = %removal.reason(),
        "stock removed"
    );
    Ok(removal)
}

/// Edit reason/date and optionally cancel. A cancelled removal cannot be reinstated.
pub fn update_stock_removal<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    removal_id: RemovalId,
    cmd: UpdateStockRemoval,
) -> DomainResult<StockRemoval> {
    ctx.authorize(Operation::ManageRemoval)?;

    let mut removal = load_removal(uow, removal_id)?;
    let loaded_version = removal.version();

    if cmd.is_cancelled == Some(false) && removal.is_cancelled() {
        return Err(DomainError::conflict(format!(
            "stock removal {removal_id} is cancelled and cannot be reinstated"
        )));
    }
    removal.edit(cmd.reason, cmd.date)?;
    if cmd.is_cancelled == Some(true) {
        removal.cancel()?;
        reverse(uow, removal.store_id(), &removal.delta(), true)?;
    }

    if removal.version() != loaded_version {
        uow.save_removal(&removal, ExpectedVersion::Exact(loaded_version))?;
        info!(
            operation = "update_stock_removal",
            store_id = %removal.store_id(),
            removal_id = %removal_id,
            cancelled = removal.is_cancelled(),
            "stock removal updated"
        );
    }
    Ok(removal)
}

pub fn cancel_stock_removal<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    removal_id: RemovalId,
) -> DomainResult<StockRemoval> {
    update_stock_removal(
        uow,
        ctx,
        removal_id,
        UpdateStockRemoval {
            is_cancelled: Some(true),
            ..UpdateStockRemoval::default()
        },
    )
}

pub fn delete_stock_removal<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    removal_id: RemovalId,
) -> DomainResult<()> {
    ctx.authorize(Operation::DeleteRemoval)?;

    let removal = load_removal(uow, removal_id)?;
    if !removal.is_cancelled() {
        reverse(uow, removal.store_id(), &removal.delta(), true)?;
    }
    uow.delete_removal(removal_id)?;

    info!(
        operation = "delete_stock_removal",
        store_id = %removal.store_id(),
        removal_id = %removal_id,
        "stock removal deleted"
    );
    Ok(())
}

pub fn get_stock_removal<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    removal_id: RemovalId,
) -> DomainResult<StockRemoval> {
    ctx.authorize(Operation::ManageRemoval)?;
    load_removal(uow, removal_id)
}
