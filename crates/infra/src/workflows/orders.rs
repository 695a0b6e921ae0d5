//! Sale lifecycle: placing, receiving, cancelling and deleting orders.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::info;

use storeledger_accounting::{OperationRef, Page, Pagination, Transaction};
use storeledger_auth::{Operation, ensure_owner};
use storeledger_core::{
    AggregateRoot, CustomerId, Decimal, DomainError, DomainResult, ExpectedVersion, OrderId,
    ProductId, StoreId,
};
use storeledger_inventory::{StockDelta, decrement, reverse};
use storeledger_products::Product;
use storeledger_sales::{
    BuiltCart, CartLine, NewOrder, Order, OrderMode, OrderStatus, build_cart, outstanding_stock,
};

use super::RequestContext;
use crate::store::UnitOfWork;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub mode: OrderMode,
    pub delivery_address: Option<String>,
    pub lines: Vec<CartLine>,
}

/// One change to a pending order's cart. Quantity 0 drops the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEdit {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Keeps the current discount when absent.
    pub discount: Option<Decimal>,
}

pub(crate) fn load_order<U: UnitOfWork + ?Sized>(uow: &U, id: OrderId) -> DomainResult<Order> {
    uow.order(id)?
        .ok_or_else(|| DomainError::not_found(format!("order {id}")))
}

/// External requesters may only touch orders of customers they own.
pub(crate) fn ensure_order_owner<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    order: &Order,
) -> DomainResult<()> {
    if ctx.requester.is_internal {
        return Ok(());
    }
    let owner = uow.customer(order.customer_id())?.and_then(|c| c.owner());
    ensure_owner(&ctx.requester, owner, format!("order {}", order.id_typed()))?;
    Ok(())
}

/// Price `lines` against the products currently in the catalog.
fn price_cart<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    lines: &[CartLine],
) -> DomainResult<BuiltCart> {
    let mut catalog: HashMap<ProductId, Product> = HashMap::with_capacity(lines.len());
    for line in lines {
        if let Some(product) = uow.product(line.product_id)? {
            catalog.insert(line.product_id, product);
        }
    }
    build_cart(lines, &catalog, ctx.config.tax_rate)
}

pub fn create_order<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    cmd: CreateOrder,
) -> DomainResult<Order> {
    ctx.authorize(Operation::PlaceOrder)?;

    let customer = uow
        .customer(cmd.customer_id)?
        .ok_or_else(|| DomainError::not_found(format!("customer {}", cmd.customer_id)))?;
    ensure_owner(
        &ctx.requester,
        customer.owner(),
        format!("customer {}", cmd.customer_id),
    )?;

    if cmd.lines.is_empty() {
        return Err(DomainError::validation("an order needs at least one item"));
    }
    let cart = price_cart(uow, ctx, &cmd.lines)?;

    // Online orders ship to the customer's address on file unless told otherwise.
    let delivery_address = match (cmd.delivery_address, cmd.mode) {
        (Some(address), _) => Some(address),
        (None, OrderMode::Online) => customer.contact().address.clone(),
        (None, _) => None,
    };

    let order = Order::place(
        NewOrder {
            id: OrderId::new(),
            store_id: cmd.store_id,
            customer_id: cmd.customer_id,
            mode: cmd.mode,
            delivery_address,
            processed_by: ctx.requester.user_id,
            placed_at: ctx.now,
        },
        cart,
    )?;

    decrement(uow, order.store_id(), &order.stock_delta())?;
    uow.save_order(&order, ExpectedVersion::NoAggregate)?;
    uow.append_transaction(Transaction::record(
        OperationRef::Sale(order.id_typed()),
        order.store_id(),
        ctx.requester.user_id,
        ctx.now,
    ))?;

    info!(
        operation = "create_order",
        store_id = %order.store_id(),
        order_id = %order.id_typed(),
        total = %order.totals().total(),
        "order placed"
    );
    Ok(order)
}

/// Move an order to `to`. Cancelling hands the stored cart quantities back.
pub fn update_order_status<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    order_id: OrderId,
    to: OrderStatus,
) -> DomainResult<Order> {
    ctx.authorize(Operation::ManageOrder)?;

    let mut order = load_order(uow, order_id)?;
    let expected = ExpectedVersion::Exact(order.version());

    if to == OrderStatus::Cancelled {
        order.cancel()?;
        reverse(uow, order.store_id(), &order.stock_delta(), true)?;
    } else {
        order.request_status(to, ctx.now)?;
    }
    uow.save_order(&order, expected)?;

    info!(
        operation = "update_order_status",
        store_id = %order.store_id(),
        order_id = %order.id_typed(),
        status = %order.status(),
        "order status updated"
    );
    Ok(order)
}

pub fn cancel_order<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    order_id: OrderId,
) -> DomainResult<Order> {
    update_order_status(uow, ctx, order_id, OrderStatus::Cancelled)
}

/// Remove an order and its cart, handing back stock it still holds.
///
/// Stock already returned by settled refunds is not returned again. An order
/// with a refund still in progress cannot be deleted.
pub fn delete_order<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    order_id: OrderId,
) -> DomainResult<()> {
    ctx.authorize(Operation::DeleteOrder)?;

    let order = load_order(uow, order_id)?;
    let refunds = uow.refunds_for_order(order_id)?;
    if let Some(open) = refunds.iter().find(|r| !r.status().is_terminal()) {
        return Err(DomainError::conflict(format!(
            "order {} has refund {} in progress ({})",
            order_id,
            open.id_typed(),
            open.status()
        )));
    }

    let held = outstanding_stock(&order, &refunds);
    if !held.is_empty() {
        reverse(uow, order.store_id(), &held, true)?;
    }
    uow.delete_order(order_id)?;

    info!(
        operation = "delete_order",
        store_id = %order.store_id(),
        order_id = %order_id,
        restocked = held.values().sum::<i64>(),
        "order deleted"
    );
    Ok(())
}

/// Rewrite the cart of a pending order and reconcile inventory with the difference.
pub fn edit_order_cart<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    order_id: OrderId,
    edits: &[CartEdit],
) -> DomainResult<Order> {
    ctx.authorize(Operation::ManageOrder)?;

    let mut order = load_order(uow, order_id)?;
    if order.status() != OrderStatus::Pending {
        return Err(DomainError::conflict(format!(
            "cart of order {} is frozen once the order is {}",
            order_id,
            order.status()
        )));
    }
    let expected = ExpectedVersion::Exact(order.version());

    let mut lines: Vec<CartLine> = order
        .items()
        .iter()
        .map(|i| CartLine::new(i.product_id, i.quantity, i.discount))
        .collect();
    for edit in edits {
        let index = lines
            .iter()
            .position(|l| l.product_id == edit.product_id)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "product {} is not part of order {}",
                    edit.product_id, order_id
                ))
            })?;
        if edit.quantity == 0 {
            lines.remove(index);
            continue;
        }
        let line = &mut lines[index];
        line.quantity = edit.quantity;
        if let Some(discount) = edit.discount {
            line.discount = discount;
        }
    }
    if lines.is_empty() {
        return Err(DomainError::validation("an order needs at least one item"));
    }

    let cart = price_cart(uow, ctx, &lines)?;
    let (taken, returned) = split_difference(&order.stock_delta(), &cart);

    if !returned.is_empty() {
        reverse(uow, order.store_id(), &returned, true)?;
    }
    if !taken.is_empty() {
        decrement(uow, order.store_id(), &taken)?;
    }
    order.replace_cart(cart)?;
    uow.save_order(&order, expected)?;

    info!(
        operation = "edit_order_cart",
        store_id = %order.store_id(),
        order_id = %order_id,
        "order cart edited"
    );
    Ok(order)
}

/// Stock to take out (`.0`) and to hand back (`.1`) when moving from `current` to `cart`.
fn split_difference(current: &StockDelta, cart: &BuiltCart) -> (StockDelta, StockDelta) {
    let next: StockDelta = cart
        .items
        .iter()
        .map(|i| (i.product_id, i.quantity))
        .collect();
    let products: BTreeSet<ProductId> = current.keys().chain(next.keys()).copied().collect();

    let mut taken = StockDelta::new();
    let mut returned = StockDelta::new();
    for product_id in products {
        let before = current.get(&product_id).copied().unwrap_or(0);
        let after = next.get(&product_id).copied().unwrap_or(0);
        match after - before {
            d if d > 0 => {
                taken.insert(product_id, d);
            }
            d if d < 0 => {
                returned.insert(product_id, -d);
            }
            _ => {}
        }
    }
    (taken, returned)
}

pub fn get_order<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    order_id: OrderId,
) -> DomainResult<Order> {
    if ctx.requester.is_internal {
        ctx.authorize(Operation::ManageOrder)?;
    }
    let order = load_order(uow, order_id)?;
    ensure_order_owner(uow, ctx, &order)?;
    Ok(order)
}

pub fn list_orders<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    store_id: StoreId,
    pagination: Pagination,
) -> DomainResult<Page<Order>> {
    ctx.authorize(Operation::ManageOrder)?;
    uow.orders(store_id, pagination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeledger_sales::{CartItem, CartTotals};

    #[test]
    fn split_difference_separates_increases_from_decreases() {
        let (p1, p2, p3) = (ProductId::new(), ProductId::new(), ProductId::new());
        let current: StockDelta = [(p1, 3), (p2, 2)].into_iter().collect();
        let item = |product_id, quantity| CartItem {
            product_id,
            quantity,
            discount: Decimal::ZERO,
            unit_price: Decimal::ONE,
        };
        let cart = BuiltCart {
            items: vec![item(p1, 5), item(p3, 1)],
            totals: CartTotals::default(),
        };

        let (taken, returned) = split_difference(&current, &cart);
        assert_eq!(taken, [(p1, 2), (p3, 1)].into_iter().collect());
        assert_eq!(returned, [(p2, 2)].into_iter().collect());
    }
}
