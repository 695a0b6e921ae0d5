//! Inventory mutation primitives.
//!
//! `decrement`, `increment` and `reverse` are the only code paths that change
//! an inventory quantity. Each one reads and checks every affected row first
//! and writes only when all of them pass, so a failing call leaves the rows
//! exactly as they were.

use std::collections::{BTreeMap, HashMap};

use storeledger_core::{DomainError, DomainResult, ProductId, StoreId};

use crate::record::{InventoryKey, InventoryRecord};

/// Requested quantity per product. Ordered so that rows are always visited in
/// the same sequence.
pub type StockDelta = BTreeMap<ProductId, i64>;

/// Row access needed by the primitives.
pub trait InventoryRows {
    fn inventory(&self, key: InventoryKey) -> DomainResult<Option<InventoryRecord>>;

    fn put_inventory(&mut self, record: InventoryRecord) -> DomainResult<()>;
}

impl InventoryRows for HashMap<InventoryKey, InventoryRecord> {
    fn inventory(&self, key: InventoryKey) -> DomainResult<Option<InventoryRecord>> {
        Ok(self.get(&key).cloned())
    }

    fn put_inventory(&mut self, record: InventoryRecord) -> DomainResult<()> {
        self.insert(record.key(), record);
        Ok(())
    }
}

/// Outcome of a primitive for one product.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub previous_quantity: i64,
    pub quantity: i64,
}

/// Collect `(product, quantity)` lines into a delta.
///
/// Rejects an empty list, non-positive quantities and a product listed twice.
pub fn stock_delta(
    lines: impl IntoIterator<Item = (ProductId, i64)>,
) -> DomainResult<StockDelta> {
    let mut delta = StockDelta::new();
    for (product_id, quantity) in lines {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for product {product_id} must be positive, got {quantity}"
            )));
        }
        if delta.insert(product_id, quantity).is_some() {
            return Err(DomainError::validation(format!(
                "product {product_id} is listed more than once"
            )));
        }
    }
    if delta.is_empty() {
        return Err(DomainError::validation("at least one item is required"));
    }
    Ok(delta)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MissingRow {
    /// Treat an absent row as quantity 0.
    Empty,
    NotFound,
}

/// Remove stock. An absent row counts as quantity 0.
pub fn decrement<R: InventoryRows + ?Sized>(
    rows: &mut R,
    store_id: StoreId,
    delta: &StockDelta,
) -> DomainResult<Vec<StockChange>> {
    apply(rows, store_id, delta, -1, MissingRow::Empty)
}

/// Add stock, creating absent rows.
pub fn increment<R: InventoryRows + ?Sized>(
    rows: &mut R,
    store_id: StoreId,
    delta: &StockDelta,
) -> DomainResult<Vec<StockChange>> {
    apply(rows, store_id, delta, 1, MissingRow::Empty)
}

/// Compensate an earlier primitive: `add = true` undoes a decrement,
/// `add = false` undoes an increment. Rows must already exist.
pub fn reverse<R: InventoryRows + ?Sized>(
    rows: &mut R,
    store_id: StoreId,
    delta: &StockDelta,
    add: bool,
) -> DomainResult<Vec<StockChange>> {
    let sign = if add { 1 } else { -1 };
    apply(rows, store_id, delta, sign, MissingRow::NotFound)
}

fn apply<R: InventoryRows + ?Sized>(
    rows: &mut R,
    store_id: StoreId,
    delta: &StockDelta,
    sign: i64,
    missing: MissingRow,
) -> DomainResult<Vec<StockChange>> {
    for (product_id, quantity) in delta {
        if *quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for product {product_id} must be positive, got {quantity}"
            )));
        }
    }

    let mut staged = Vec::with_capacity(delta.len());
    for (&product_id, &quantity) in delta {
        let key = InventoryKey::new(store_id, product_id);
        let mut row = match (rows.inventory(key)?, missing) {
            (Some(row), _) => row,
            (None, MissingRow::Empty) => InventoryRecord::empty(store_id, product_id),
            (None, MissingRow::NotFound) => {
                return Err(DomainError::not_found(format!("inventory for {key}")));
            }
        };
        let previous_quantity = row.quantity();
        row.apply_delta(sign * quantity)?;
        staged.push((
            StockChange {
                product_id,
                previous_quantity,
                quantity: row.quantity(),
            },
            row,
        ));
    }

    let mut changes = Vec::with_capacity(staged.len());
    for (change, row) in staged {
        rows.put_inventory(row)?;
        changes.push(change);
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Rows = HashMap<InventoryKey, InventoryRecord>;

    fn seeded(store: StoreId, stock: &[(ProductId, i64)]) -> Rows {
        let mut rows = Rows::new();
        for &(product, qty) in stock {
            increment(&mut rows, store, &[(product, qty)].into_iter().collect()).unwrap();
        }
        rows
    }

    fn qty(rows: &Rows, store: StoreId, product: ProductId) -> Option<i64> {
        rows.get(&InventoryKey::new(store, product)).map(|r| r.quantity())
    }

    #[test]
    fn decrement_is_all_or_nothing() {
        let store = StoreId::new();
        let (p1, p2) = (ProductId::new(), ProductId::new());
        let mut rows = seeded(store, &[(p1, 10), (p2, 1)]);

        let delta: StockDelta = [(p1, 3), (p2, 2)].into_iter().collect();
        match decrement(&mut rows, store, &delta) {
            Err(DomainError::InsufficientStock(_)) => {}
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(qty(&rows, store, p1), Some(10));
        assert_eq!(qty(&rows, store, p2), Some(1));
    }

    #[test]
    fn decrement_treats_absent_row_as_empty() {
        let store = StoreId::new();
        let mut rows = Rows::new();
        let delta: StockDelta = [(ProductId::new(), 1)].into_iter().collect();
        assert!(matches!(
            decrement(&mut rows, store, &delta),
            Err(DomainError::InsufficientStock(_))
        ));
        assert!(rows.is_empty());
    }

    #[test]
    fn decrement_reports_previous_quantity() {
        let store = StoreId::new();
        let p1 = ProductId::new();
        let mut rows = seeded(store, &[(p1, 10)]);

        let changes = decrement(&mut rows, store, &[(p1, 4)].into_iter().collect()).unwrap();
        assert_eq!(
            changes,
            vec![StockChange {
                product_id: p1,
                previous_quantity: 10,
                quantity: 6
            }]
        );
    }

    #[test]
    fn increment_creates_missing_rows() {
        let store = StoreId::new();
        let p1 = ProductId::new();
        let mut rows = Rows::new();
        increment(&mut rows, store, &[(p1, 20)].into_iter().collect()).unwrap();
        assert_eq!(qty(&rows, store, p1), Some(20));
    }

    #[test]
    fn reverse_requires_an_existing_row() {
        let store = StoreId::new();
        let mut rows = Rows::new();
        let delta: StockDelta = [(ProductId::new(), 1)].into_iter().collect();
        assert!(matches!(
            reverse(&mut rows, store, &delta, true),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn reverse_undoes_the_matching_primitive() {
        let store = StoreId::new();
        let p1 = ProductId::new();
        let mut rows = seeded(store, &[(p1, 10)]);
        let delta: StockDelta = [(p1, 4)].into_iter().collect();

        decrement(&mut rows, store, &delta).unwrap();
        reverse(&mut rows, store, &delta, true).unwrap();
        assert_eq!(qty(&rows, store, p1), Some(10));

        increment(&mut rows, store, &delta).unwrap();
        reverse(&mut rows, store, &delta, false).unwrap();
        assert_eq!(qty(&rows, store, p1), Some(10));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let store = StoreId::new();
        let p1 = ProductId::new();
        let mut rows = seeded(store, &[(p1, 10)]);
        let delta: StockDelta = [(p1, 0)].into_iter().collect();
        assert!(matches!(
            increment(&mut rows, store, &delta),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn stock_delta_rejects_duplicates_and_empty_lists() {
        let p1 = ProductId::new();
        assert!(stock_delta([(p1, 1), (p1, 2)]).is_err());
        assert!(stock_delta(Vec::new()).is_err());
        assert!(stock_delta([(p1, -1)]).is_err());
        assert_eq!(stock_delta([(p1, 3)]).unwrap().get(&p1), Some(&3));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Decrement(usize, i64),
            Increment(usize, i64),
            Reverse(usize, i64, bool),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..3, 1i64..20).prop_map(|(p, q)| Op::Decrement(p, q)),
                (0usize..3, 1i64..20).prop_map(|(p, q)| Op::Increment(p, q)),
                (0usize..3, 1i64..20, any::<bool>()).prop_map(|(p, q, a)| Op::Reverse(p, q, a)),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: no sequence of primitive calls drives a quantity below zero,
            /// and a rejected call changes nothing.
            #[test]
            fn quantity_never_negative(ops in prop::collection::vec(op_strategy(), 1..60)) {
                let store = StoreId::new();
                let products = [ProductId::new(), ProductId::new(), ProductId::new()];
                let mut rows = Rows::new();

                for op in ops {
                    let before = rows.clone();
                    let result = match op {
                        Op::Decrement(p, q) => {
                            decrement(&mut rows, store, &[(products[p], q)].into_iter().collect())
                        }
                        Op::Increment(p, q) => {
                            increment(&mut rows, store, &[(products[p], q)].into_iter().collect())
                        }
                        Op::Reverse(p, q, add) => {
                            reverse(&mut rows, store, &[(products[p], q)].into_iter().collect(), add)
                        }
                    };
                    if result.is_err() {
                        prop_assert_eq!(&rows, &before);
                    }
                    for row in rows.values() {
                        prop_assert!(row.quantity() >= 0);
                    }
                }
            }
        }
    }
}
