use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use storeledger_core::{
    AggregateRoot, Decimal, DomainError, DomainResult, OrderId, ProductId, RefundId, StoreId,
};
use storeledger_inventory::StockDelta;

use crate::order::{Order, OrderStatus};

/// Refund application status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Approved,
    Cancelled,
    Rejected,
    Refunded,
}

impl RefundStatus {
    /// Legal edges. Anything not listed here is a conflict.
    pub fn can_transition_to(self, next: RefundStatus) -> bool {
        use RefundStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Refunded)
                | (Approved, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RefundStatus::Cancelled | RefundStatus::Rejected | RefundStatus::Refunded
        )
    }
}

impl core::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RefundStatus::Pending => "Pending",
            RefundStatus::Approved => "Approved",
            RefundStatus::Cancelled => "Cancelled",
            RefundStatus::Rejected => "Rejected",
            RefundStatus::Refunded => "Refunded",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A refund application as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRefund {
    pub id: RefundId,
    pub reason: Option<String>,
    pub items: Vec<RefundItem>,
    /// Overrides the amount computed from the order lines.
    pub amount: Option<Decimal>,
    pub status: RefundStatus,
    pub applied_at: DateTime<Utc>,
}

/// Result of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundTransition {
    /// The refund already had the requested status.
    Unchanged,
    Changed { from: RefundStatus, to: RefundStatus },
}

/// Aggregate root: Refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    id: RefundId,
    store_id: StoreId,
    order_id: OrderId,
    reason: Option<String>,
    amount: Decimal,
    status: RefundStatus,
    application_date: DateTime<Utc>,
    date_refunded: Option<DateTime<Utc>>,
    items: Vec<RefundItem>,
    version: u64,
}

impl Refund {
    /// Validate an application against its order.
    ///
    /// The order must have been received, must not be cancelled or already
    /// under refund, and the application must arrive within `window` of
    /// receipt. Items must be a subset of the order lines.
    pub fn apply(new: NewRefund, order: &Order, window: Duration) -> DomainResult<Self> {
        match order.status() {
            OrderStatus::Received => {}
            OrderStatus::Pending => {
                return Err(DomainError::validation(
                    "order must be received before it can be refunded",
                ));
            }
            OrderStatus::Cancelled => {
                return Err(DomainError::validation("order has been cancelled"));
            }
            OrderStatus::ForRefund | OrderStatus::Refunded => {
                return Err(DomainError::validation(format!(
                    "order {} already has a refund ({})",
                    order.id_typed(),
                    order.status()
                )));
            }
        }

        let received = order.date_received().ok_or_else(|| {
            DomainError::validation("order must be received before it can be refunded")
        })?;
        if new.applied_at - received > window {
            return Err(DomainError::validation(format!(
                "refund application is too late: more than {} days after receipt",
                window.num_days()
            )));
        }

        if !matches!(
            new.status,
            RefundStatus::Pending | RefundStatus::Approved | RefundStatus::Refunded
        ) {
            return Err(DomainError::validation(format!(
                "a refund cannot start as {}",
                new.status
            )));
        }

        if new.items.is_empty() {
            return Err(DomainError::validation("a refund needs at least one item"));
        }

        let mut seen = HashSet::with_capacity(new.items.len());
        let mut computed = Decimal::ZERO;
        for item in &new.items {
            let ordered = order.item(&item.product_id).ok_or_else(|| {
                DomainError::validation(format!(
                    "product {} is not part of order {}",
                    item.product_id,
                    order.id_typed()
                ))
            })?;
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "refund quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if item.quantity > ordered.quantity {
                return Err(DomainError::validation(format!(
                    "refund quantity {} for product {} exceeds the ordered quantity {}",
                    item.quantity, item.product_id, ordered.quantity
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} is listed more than once",
                    item.product_id
                )));
            }
            computed += ordered.net_unit_price() * Decimal::from(item.quantity);
        }

        let amount = match new.amount {
            Some(amount) if amount <= Decimal::ZERO => {
                return Err(DomainError::validation("refund amount must be positive"));
            }
            Some(amount) => amount,
            None => computed,
        };

        let date_refunded = (new.status == RefundStatus::Refunded).then_some(new.applied_at);

        Ok(Self {
            id: new.id,
            store_id: order.store_id(),
            order_id: order.id_typed(),
            reason: new.reason,
            amount,
            status: new.status,
            application_date: new.applied_at,
            date_refunded,
            items: new.items,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> RefundId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn status(&self) -> RefundStatus {
        self.status
    }

    pub fn application_date(&self) -> DateTime<Utc> {
        self.application_date
    }

    pub fn date_refunded(&self) -> Option<DateTime<Utc>> {
        self.date_refunded
    }

    pub fn items(&self) -> &[RefundItem] {
        &self.items
    }

    /// Quantities handed back to inventory once refunded.
    pub fn stock_delta(&self) -> StockDelta {
        self.items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect()
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
        self.version += 1;
    }

    /// Move to `next` if the transition table allows it.
    ///
    /// Requesting the current status is a no-op, so a resubmitted update never
    /// re-runs side effects.
    pub fn transition(
        &mut self,
        next: RefundStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<RefundTransition> {
        if next == self.status {
            return Ok(RefundTransition::Unchanged);
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "refund {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let from = self.status;
        self.status = next;
        if next == RefundStatus::Refunded {
            self.date_refunded = Some(at);
        }
        self.version += 1;
        Ok(RefundTransition::Changed { from, to: next })
    }
}

impl AggregateRoot for Refund {
    type Id = RefundId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Stock `order` still holds, given the refunds raised against it.
///
/// A cancelled order holds nothing. Quantities of refunds that reached
/// `Refunded` are already back in inventory and are subtracted.
pub fn outstanding_stock<'a>(
    order: &Order,
    refunds: impl IntoIterator<Item = &'a Refund>,
) -> StockDelta {
    if order.status() == OrderStatus::Cancelled {
        return StockDelta::new();
    }
    let mut held = order.stock_delta();
    let settled = refunds
        .into_iter()
        .filter(|r| r.order_id() == order.id_typed() && r.status() == RefundStatus::Refunded);
    for refund in settled {
        for item in refund.items() {
            if let Some(quantity) = held.get_mut(&item.product_id) {
                *quantity -= item.quantity;
            }
        }
    }
    held.retain(|_, quantity| *quantity > 0);
    held
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{BuiltCart, CartItem, CartTotals};
    use crate::order::{NewOrder, OrderMode};
    use storeledger_core::{CustomerId, UserId};

    fn window() -> Duration {
        Duration::days(15)
    }

    fn test_received_order(product_id: ProductId, received: DateTime<Utc>) -> Order {
        let cart = BuiltCart {
            items: vec![CartItem {
                product_id,
                quantity: 3,
                discount: Decimal::new(1, 1),
                unit_price: Decimal::new(100, 0),
            }],
            totals: CartTotals::default(),
        };
        let mut order = Order::place(
            NewOrder {
                id: OrderId::new(),
                store_id: StoreId::new(),
                customer_id: CustomerId::new(),
                mode: OrderMode::Offline,
                delivery_address: None,
                processed_by: UserId::new(),
                placed_at: received,
            },
            cart,
        )
        .unwrap();
        order.receive(received).unwrap();
        order
    }

    fn test_application(product_id: ProductId, quantity: i64, at: DateTime<Utc>) -> NewRefund {
        NewRefund {
            id: RefundId::new(),
            reason: Some("broken lid".into()),
            items: vec![RefundItem {
                product_id,
                quantity,
            }],
            amount: None,
            status: RefundStatus::Pending,
            applied_at: at,
        }
    }

    #[test]
    fn amount_is_computed_from_net_unit_prices() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let order = test_received_order(p1, now);

        let refund = Refund::apply(test_application(p1, 2, now), &order, window()).unwrap();
        // 100 * (1 - 0.1) * 2
        assert_eq!(refund.amount(), Decimal::new(180, 0));
        assert_eq!(refund.store_id(), order.store_id());
        assert_eq!(refund.status(), RefundStatus::Pending);
    }

    #[test]
    fn quantity_above_ordered_is_rejected() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let order = test_received_order(p1, now);

        match Refund::apply(test_application(p1, 4, now), &order, window()) {
            Err(DomainError::Validation(msg)) if msg.contains("exceeds") => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn late_application_is_rejected() {
        let p1 = ProductId::new();
        let received = Utc::now();
        let order = test_received_order(p1, received);

        let late = received + Duration::days(16);
        match Refund::apply(test_application(p1, 1, late), &order, window()) {
            Err(DomainError::Validation(msg)) if msg.contains("too late") => {}
            other => panic!("expected too late, got {other:?}"),
        }
        let on_time = received + Duration::days(15);
        assert!(Refund::apply(test_application(p1, 1, on_time), &order, window()).is_ok());
    }

    #[test]
    fn order_must_be_received_and_not_under_refund() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let mut order = test_received_order(p1, now);
        order.mark_for_refund().unwrap();

        assert!(matches!(
            Refund::apply(test_application(p1, 1, now), &order, window()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn foreign_products_and_bad_amounts_are_rejected() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let order = test_received_order(p1, now);

        assert!(Refund::apply(test_application(ProductId::new(), 1, now), &order, window()).is_err());

        let mut zero_amount = test_application(p1, 1, now);
        zero_amount.amount = Some(Decimal::ZERO);
        assert!(Refund::apply(zero_amount, &order, window()).is_err());

        let mut no_items = test_application(p1, 1, now);
        no_items.items.clear();
        assert!(Refund::apply(no_items, &order, window()).is_err());
    }

    #[test]
    fn transition_table_is_enforced() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let order = test_received_order(p1, now);
        let mut refund = Refund::apply(test_application(p1, 1, now), &order, window()).unwrap();

        match refund.transition(RefundStatus::Refunded, now) {
            Err(DomainError::Conflict(_)) => {}
            other => panic!("expected conflict, got {other:?}"),
        }

        assert_eq!(
            refund.transition(RefundStatus::Approved, now).unwrap(),
            RefundTransition::Changed {
                from: RefundStatus::Pending,
                to: RefundStatus::Approved
            }
        );
        refund.transition(RefundStatus::Refunded, now).unwrap();
        assert_eq!(refund.date_refunded(), Some(now));

        assert_eq!(
            refund.transition(RefundStatus::Refunded, now).unwrap(),
            RefundTransition::Unchanged
        );
        assert!(refund.transition(RefundStatus::Cancelled, now).is_err());
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        use RefundStatus::*;
        let all = [Pending, Approved, Cancelled, Rejected, Refunded];
        for from in all.into_iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn settled_refunds_reduce_outstanding_stock() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let mut order = test_received_order(p1, now);
        let expected: StockDelta = [(p1, 3)].into_iter().collect();
        assert_eq!(outstanding_stock(&order, []), expected);

        let mut open = Refund::apply(test_application(p1, 1, now), &order, window()).unwrap();
        assert_eq!(outstanding_stock(&order, [&open]), expected);

        open.transition(RefundStatus::Approved, now).unwrap();
        open.transition(RefundStatus::Refunded, now).unwrap();
        order.mark_for_refund().unwrap();
        order.mark_refunded().unwrap();
        let expected: StockDelta = [(p1, 2)].into_iter().collect();
        assert_eq!(outstanding_stock(&order, [&open]), expected);
    }

    #[test]
    fn fully_refunded_or_cancelled_orders_hold_nothing() {
        let p1 = ProductId::new();
        let now = Utc::now();
        let order = test_received_order(p1, now);
        let mut refund = Refund::apply(test_application(p1, 3, now), &order, window()).unwrap();
        refund.transition(RefundStatus::Approved, now).unwrap();
        refund.transition(RefundStatus::Refunded, now).unwrap();
        assert!(outstanding_stock(&order, [&refund]).is_empty());

        let mut cancelled = test_received_order(p1, now);
        cancelled.cancel().unwrap();
        assert!(outstanding_stock(&cancelled, []).is_empty());
    }
}
