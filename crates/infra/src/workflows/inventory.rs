//! Direct inventory maintenance and reads.

use serde::{Deserialize, Serialize};
use tracing::info;

use storeledger_accounting::{Page, Pagination};
use storeledger_auth::Operation;
use storeledger_core::{Decimal, DomainError, DomainResult, ProductId, StoreId};
use storeledger_inventory::{InventoryKey, InventoryRecord, StockDelta, increment};

use super::RequestContext;
use crate::store::UnitOfWork;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddInventory {
    pub store_id: StoreId,
    pub product_id: ProductId,
    /// Added to the current quantity. May be 0 when only the discount changes.
    pub quantity: i64,
    pub max_discount_amount: Option<Decimal>,
}

/// Add stock for a product outside of a restock, creating the row if needed.
pub fn add_inventory<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    cmd: AddInventory,
) -> DomainResult<InventoryRecord> {
    ctx.authorize(Operation::ManageInventory)?;

    if !uow.product(cmd.product_id)?.is_some_and(|p| p.can_be_sold()) {
        return Err(DomainError::not_found(format!("product {}", cmd.product_id)));
    }
    if cmd.quantity < 0 || (cmd.quantity == 0 && cmd.max_discount_amount.is_none()) {
        return Err(DomainError::validation(format!(
            "quantity to add must be positive, got {}",
            cmd.quantity
        )));
    }

    let key = InventoryKey::new(cmd.store_id, cmd.product_id);
    if cmd.quantity > 0 {
        let delta: StockDelta = [(cmd.product_id, cmd.quantity)].into_iter().collect();
        increment(uow, cmd.store_id, &delta)?;
    }
    let mut row = uow
        .inventory(key)?
        .unwrap_or_else(|| InventoryRecord::empty(cmd.store_id, cmd.product_id));
    if let Some(max_discount) = cmd.max_discount_amount {
        row.set_max_discount_amount(max_discount)?;
        uow.put_inventory(row.clone())?;
    }

    info!(
        operation = "add_inventory",
        store_id = %cmd.store_id,
        product_id = %cmd.product_id,
        quantity = row.quantity(),
        "inventory added"
    );
    Ok(row)
}

pub fn get_inventory<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    store_id: StoreId,
    product_id: ProductId,
) -> DomainResult<InventoryRecord> {
    ctx.authorize(Operation::ReadInventory)?;
    let key = InventoryKey::new(store_id, product_id);
    uow.inventory(key)?
        .ok_or_else(|| DomainError::not_found(format!("inventory for {key}")))
}

/// Rows of one store ordered by product.
pub fn list_inventory<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    store_id: StoreId,
    pagination: Pagination,
) -> DomainResult<Page<InventoryRecord>> {
    ctx.authorize(Operation::ReadInventory)?;
    uow.inventory_in_store(store_id, pagination)
}
