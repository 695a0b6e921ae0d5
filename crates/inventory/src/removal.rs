use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_core::{AggregateRoot, DomainError, DomainResult, ProductId, RemovalId, StoreId, UserId};

use crate::primitives::{StockChange, StockDelta};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    Damaged,
    Lost,
    InternalUse,
    Adjustment,
    ReturnToSupplier,
}

impl core::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RemovalReason::Damaged => "Damaged",
            RemovalReason::Lost => "Lost",
            RemovalReason::InternalUse => "Internal Use",
            RemovalReason::Adjustment => "Adjustment",
            RemovalReason::ReturnToSupplier => "Return To Supplier",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalItem {
    pub product_id: ProductId,
    /// Quantity observed right before the removal was applied.
    pub previous_quantity: i64,
    pub removal_quantity: i64,
}

/// Aggregate root: StockRemoval.
///
/// Stock is taken out eagerly when the removal is recorded; cancelling puts it
/// back. A cancelled removal is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRemoval {
    id: RemovalId,
    store_id: StoreId,
    reason: RemovalReason,
    date: DateTime<Utc>,
    is_cancelled: bool,
    requested_by: UserId,
    items: Vec<RemovalItem>,
    version: u64,
}

impl StockRemoval {
    /// Record a removal from the changes reported by the decrement that applied it.
    pub fn record(
        id: RemovalId,
        store_id: StoreId,
        reason: RemovalReason,
        date: DateTime<Utc>,
        requested_by: UserId,
        changes: &[StockChange],
    ) -> DomainResult<Self> {
        if changes.is_empty() {
            return Err(DomainError::validation("a removal needs at least one item"));
        }
        let items = changes
            .iter()
            .map(|c| RemovalItem {
                product_id: c.product_id,
                previous_quantity: c.previous_quantity,
                removal_quantity: c.previous_quantity - c.quantity,
            })
            .collect();

        Ok(Self {
            id,
            store_id,
            reason,
            date,
            is_cancelled: false,
            requested_by,
            items,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> RemovalId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn reason(&self) -> RemovalReason {
        self.reason
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn items(&self) -> &[RemovalItem] {
        &self.items
    }

    /// Quantities to hand back to inventory on cancellation.
    pub fn delta(&self) -> StockDelta {
        self.items
            .iter()
            .map(|i| (i.product_id, i.removal_quantity))
            .collect()
    }

    fn ensure_active(&self) -> DomainResult<()> {
        if self.is_cancelled {
            return Err(DomainError::conflict(format!(
                "stock removal {} is already cancelled",
                self.id
            )));
        }
        Ok(())
    }

    /// Edit reason and/or date. Items never change.
    pub fn edit(
        &mut self,
        reason: Option<RemovalReason>,
        date: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        self.ensure_active()?;
        if reason.is_none() && date.is_none() {
            return Ok(());
        }
        if let Some(reason) = reason {
            self.reason = reason;
        }
        if let Some(date) = date {
            self.date = date;
        }
        self.version += 1;
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        self.ensure_active()?;
        self.is_cancelled = true;
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for StockRemoval {
    type Id = RemovalId;

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

    fn test_removal() -> StockRemoval {
        let p1 = ProductId::new();
        StockRemoval::record(
            RemovalId::new(),
            StoreId::new(),
            RemovalReason::Damaged,
            Utc::now(),
            UserId::new(),
            &[StockChange {
                product_id: p1,
                previous_quantity: 10,
                quantity: 7,
            }],
        )
        .unwrap()
    }

    #[test]
    fn record_snapshots_previous_quantity() {
        let removal = test_removal();
        let item = &removal.items()[0];
        assert_eq!(item.previous_quantity, 10);
        assert_eq!(item.removal_quantity, 3);
        assert_eq!(removal.delta().get(&item.product_id), Some(&3));
        assert_eq!(removal.version(), 1);
    }

    #[test]
    fn cancelling_twice_is_a_conflict() {
        let mut removal = test_removal();
        removal.cancel().unwrap();
        match removal.cancel() {
            Err(DomainError::Conflict(_)) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(removal.edit(Some(RemovalReason::Lost), None).is_err());
    }

    #[test]
    fn edit_changes_reason_only_while_active() {
        let mut removal = test_removal();
        removal.edit(Some(RemovalReason::Adjustment), None).unwrap();
        assert_eq!(removal.reason(), RemovalReason::Adjustment);
        assert_eq!(removal.version(), 2);
    }

    #[test]
    fn empty_removal_is_rejected() {
        let result = StockRemoval::record(
            RemovalId::new(),
            StoreId::new(),
            RemovalReason::Lost,
            Utc::now(),
            UserId::new(),
            &[],
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
