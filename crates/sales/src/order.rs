use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_core::{
    AggregateRoot, CustomerId, DomainError, DomainResult, OrderId, ProductId, StoreId, UserId,
};
use storeledger_inventory::StockDelta;

use crate::cart::{BuiltCart, CartItem, CartTotals};

/// Order status lifecycle.
///
/// `ForRefund` and `Refunded` are entered by the refund workflow only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Received,
    Cancelled,
    ForRefund,
    Refunded,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Received => "Received",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::ForRefund => "For Refund",
            OrderStatus::Refunded => "Refunded",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    Online,
    Offline,
}

/// Header data of an order about to be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: OrderId,
    pub store_id: StoreId,
    pub customer_id: CustomerId,
    pub mode: OrderMode,
    pub delivery_address: Option<String>,
    pub processed_by: UserId,
    pub placed_at: DateTime<Utc>,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    store_id: StoreId,
    customer_id: CustomerId,
    status: OrderStatus,
    mode: OrderMode,
    delivery_address: Option<String>,
    items: Vec<CartItem>,
    totals: CartTotals,
    date_placed: DateTime<Utc>,
    date_received: Option<DateTime<Utc>>,
    processed_by: UserId,
    version: u64,
}

impl Order {
    pub fn place(new: NewOrder, cart: BuiltCart) -> DomainResult<Self> {
        if cart.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        let delivery_address = new
            .delivery_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        if new.mode == OrderMode::Online && delivery_address.is_none() {
            return Err(DomainError::validation(
                "online orders require a delivery address",
            ));
        }

        Ok(Self {
            id: new.id,
            store_id: new.store_id,
            customer_id: new.customer_id,
            status: OrderStatus::Pending,
            mode: new.mode,
            delivery_address,
            items: cart.items,
            totals: cart.totals,
            date_placed: new.placed_at,
            date_received: None,
            processed_by: new.processed_by,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn mode(&self) -> OrderMode {
        self.mode
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    pub fn totals(&self) -> CartTotals {
        self.totals
    }

    pub fn date_placed(&self) -> DateTime<Utc> {
        self.date_placed
    }

    pub fn date_received(&self) -> Option<DateTime<Utc>> {
        self.date_received
    }

    pub fn processed_by(&self) -> UserId {
        self.processed_by
    }

    /// Quantities taken out of inventory by this order, from the stored items.
    pub fn stock_delta(&self) -> StockDelta {
        self.items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect()
    }

    fn transition_error(&self, to: OrderStatus) -> DomainError {
        DomainError::conflict(format!(
            "order {} cannot move from {} to {}",
            self.id, self.status, to
        ))
    }

    fn ensure_status(&self, allowed: &[OrderStatus], to: OrderStatus) -> DomainResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.transition_error(to))
        }
    }

    fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.version += 1;
    }

    pub fn receive(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_status(&[OrderStatus::Pending], OrderStatus::Received)?;
        self.date_received = Some(at);
        self.set_status(OrderStatus::Received);
        Ok(())
    }

    /// Caller is responsible for handing `stock_delta()` back to inventory.
    pub fn cancel(&mut self) -> DomainResult<()> {
        self.ensure_status(
            &[OrderStatus::Pending, OrderStatus::Received],
            OrderStatus::Cancelled,
        )?;
        self.set_status(OrderStatus::Cancelled);
        Ok(())
    }

    /// Status change requested through the order surface.
    pub fn request_status(&mut self, to: OrderStatus, at: DateTime<Utc>) -> DomainResult<()> {
        match to {
            OrderStatus::Received => self.receive(at),
            OrderStatus::Cancelled => self.cancel(),
            OrderStatus::ForRefund | OrderStatus::Refunded => Err(DomainError::conflict(format!(
                "order status {to} is managed by refunds"
            ))),
            OrderStatus::Pending => Err(self.transition_error(to)),
        }
    }

    pub fn mark_for_refund(&mut self) -> DomainResult<()> {
        self.ensure_status(&[OrderStatus::Received], OrderStatus::ForRefund)?;
        self.set_status(OrderStatus::ForRefund);
        Ok(())
    }

    pub fn mark_refunded(&mut self) -> DomainResult<()> {
        self.ensure_status(
            &[OrderStatus::Received, OrderStatus::ForRefund],
            OrderStatus::Refunded,
        )?;
        self.set_status(OrderStatus::Refunded);
        Ok(())
    }

    /// A refund application was withdrawn or turned down.
    pub fn reopen_after_refund(&mut self) -> DomainResult<()> {
        self.ensure_status(&[OrderStatus::ForRefund], OrderStatus::Received)?;
        self.set_status(OrderStatus::Received);
        Ok(())
    }

    /// Replace the cart of a pending order. Inventory is reconciled by the caller.
    pub fn replace_cart(&mut self, cart: BuiltCart) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::conflict(format!(
                "cart of order {} is frozen once the order is {}",
                self.id, self.status
            )));
        }
        if cart.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        self.items = cart.items;
        self.totals = cart.totals;
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeledger_core::Decimal;

    fn test_cart() -> BuiltCart {
        BuiltCart {
            items: vec![CartItem {
                product_id: ProductId::new(),
                quantity: 2,
                discount: Decimal::ZERO,
                unit_price: Decimal::new(10, 0),
            }],
            totals: CartTotals {
                amount: Decimal::new(20, 0),
                discount: Decimal::ZERO,
                tax: Decimal::new(36, 1),
            },
        }
    }

    fn test_new_order(mode: OrderMode, address: Option<&str>) -> NewOrder {
        NewOrder {
            id: OrderId::new(),
            store_id: StoreId::new(),
            customer_id: CustomerId::new(),
            mode,
            delivery_address: address.map(str::to_string),
            processed_by: UserId::new(),
            placed_at: Utc::now(),
        }
    }

    fn test_order() -> Order {
        Order::place(test_new_order(OrderMode::Offline, None), test_cart()).unwrap()
    }

    #[test]
    fn placed_order_starts_pending() {
        let order = test_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.version(), 1);
        assert_eq!(order.stock_delta().values().sum::<i64>(), 2);
    }

    #[test]
    fn empty_cart_is_rejected() {
        let cart = BuiltCart {
            items: Vec::new(),
            totals: CartTotals::default(),
        };
        match Order::place(test_new_order(OrderMode::Offline, None), cart) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn online_orders_need_an_address() {
        assert!(Order::place(test_new_order(OrderMode::Online, Some("  ")), test_cart()).is_err());
        let order =
            Order::place(test_new_order(OrderMode::Online, Some("1 Main St")), test_cart()).unwrap();
        assert_eq!(order.delivery_address(), Some("1 Main St"));
    }

    #[test]
    fn receive_then_cancel() {
        let mut order = test_order();
        let at = Utc::now();
        order.request_status(OrderStatus::Received, at).unwrap();
        assert_eq!(order.date_received(), Some(at));

        order.request_status(OrderStatus::Cancelled, at).unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.version(), 3);
    }

    #[test]
    fn illegal_transitions_are_conflicts() {
        let mut order = test_order();
        order.cancel().unwrap();

        for to in [
            OrderStatus::Received,
            OrderStatus::Cancelled,
            OrderStatus::Pending,
            OrderStatus::ForRefund,
        ] {
            match order.request_status(to, Utc::now()) {
                Err(DomainError::Conflict(_)) => {}
                other => panic!("expected conflict for {to}, got {other:?}"),
            }
        }
    }

    #[test]
    fn refund_statuses_are_not_reachable_through_order_updates() {
        let mut order = test_order();
        order.receive(Utc::now()).unwrap();
        assert!(order.request_status(OrderStatus::Refunded, Utc::now()).is_err());

        order.mark_for_refund().unwrap();
        order.reopen_after_refund().unwrap();
        order.mark_refunded().unwrap();
        assert_eq!(order.status(), OrderStatus::Refunded);
    }

    #[test]
    fn cart_is_frozen_after_pending() {
        let mut order = test_order();
        assert!(order.replace_cart(test_cart()).is_ok());
        order.receive(Utc::now()).unwrap();
        assert!(matches!(
            order.replace_cart(test_cart()),
            Err(DomainError::Conflict(_))
        ));
    }
}
