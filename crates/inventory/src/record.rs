use serde::{Deserialize, Serialize};

use storeledger_core::money::ensure_fraction;
use storeledger_core::{AggregateRoot, Decimal, DomainError, DomainResult, ProductId, StoreId};

/// Key of an inventory row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    pub store_id: StoreId,
    pub product_id: ProductId,
}

impl InventoryKey {
    pub fn new(store_id: StoreId, product_id: ProductId) -> Self {
        Self {
            store_id,
            product_id,
        }
    }
}

impl core::fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "store {} / product {}", self.store_id, self.product_id)
    }
}

/// Aggregate root: authoritative stock level of one product in one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    key: InventoryKey,
    quantity: i64,
    max_discount_amount: Decimal,
    version: u64,
}

impl InventoryRecord {
    /// A row that has never been written. Its first change brings it to version 1.
    pub fn empty(store_id: StoreId, product_id: ProductId) -> Self {
        Self {
            key: InventoryKey::new(store_id, product_id),
            quantity: 0,
            max_discount_amount: Decimal::ZERO,
            version: 0,
        }
    }

    pub fn key(&self) -> InventoryKey {
        self.key
    }

    pub fn store_id(&self) -> StoreId {
        self.key.store_id
    }

    pub fn product_id(&self) -> ProductId {
        self.key.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn max_discount_amount(&self) -> Decimal {
        self.max_discount_amount
    }

    pub fn set_max_discount_amount(&mut self, value: Decimal) -> DomainResult<()> {
        ensure_fraction(value, "max discount amount")?;
        self.max_discount_amount = value;
        self.version += 1;
        Ok(())
    }

    /// Apply a signed change. Only the mutation primitives call this.
    pub(crate) fn apply_delta(&mut self, delta: i64) -> DomainResult<()> {
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation(format!("quantity overflow for {}", self.key)))?;
        if next < 0 {
            return Err(DomainError::insufficient_stock(format!(
                "{}: {} available, {} requested",
                self.key, self.quantity, -delta
            )));
        }
        self.quantity = next;
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for InventoryRecord {
    type Id = InventoryKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_bump_version_and_never_go_negative() {
        let mut row = InventoryRecord::empty(StoreId::new(), ProductId::new());
        row.apply_delta(5).unwrap();
        assert_eq!((row.quantity(), row.version()), (5, 1));

        match row.apply_delta(-6) {
            Err(DomainError::InsufficientStock(_)) => {}
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!((row.quantity(), row.version()), (5, 1));
    }

    #[test]
    fn max_discount_must_be_a_fraction() {
        let mut row = InventoryRecord::empty(StoreId::new(), ProductId::new());
        assert!(row.set_max_discount_amount(Decimal::new(25, 2)).is_ok());
        assert!(row.set_max_discount_amount(Decimal::new(2, 0)).is_err());
        assert_eq!(row.max_discount_amount(), Decimal::new(25, 2));
    }
}
