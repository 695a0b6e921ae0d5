use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storeledger_core::{AggregateRoot, DomainError, DomainResult, ProductId, RestockId, StoreId, UserId};
use storeledger_inventory::{StockChange, StockDelta};

/// Restock status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestockStatus {
    Pending,
    Completed,
    Cancelled,
}

impl RestockStatus {
    pub fn can_transition_to(self, next: RestockStatus) -> bool {
        use RestockStatus::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Cancelled) | (Completed, Cancelled)
        )
    }
}

impl core::fmt::Display for RestockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RestockStatus::Pending => "Pending",
            RestockStatus::Completed => "Completed",
            RestockStatus::Cancelled => "Cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockItem {
    pub product_id: ProductId,
    /// Inventory quantity before this restock was applied.
    pub previous_quantity: i64,
    pub restock_quantity: i64,
}

/// Aggregate root: Restock.
///
/// Stock arrives when the restock is completed, not when it is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restock {
    id: RestockId,
    store_id: StoreId,
    status: RestockStatus,
    date_placed: DateTime<Utc>,
    date_received: Option<DateTime<Utc>>,
    requested_by: UserId,
    items: Vec<RestockItem>,
    version: u64,
}

impl Restock {
    pub fn place(
        id: RestockId,
        store_id: StoreId,
        requested_by: UserId,
        placed_at: DateTime<Utc>,
        items: Vec<RestockItem>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("a restock needs at least one item"));
        }
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.restock_quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "restock quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} is listed more than once",
                    item.product_id
                )));
            }
        }

        Ok(Self {
            id,
            store_id,
            status: RestockStatus::Pending,
            date_placed: placed_at,
            date_received: None,
            requested_by,
            items,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> RestockId {
        self.id
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn status(&self) -> RestockStatus {
        self.status
    }

    pub fn date_placed(&self) -> DateTime<Utc> {
        self.date_placed
    }

    pub fn date_received(&self) -> Option<DateTime<Utc>> {
        self.date_received
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn items(&self) -> &[RestockItem] {
        &self.items
    }

    /// Whether the restock quantities are currently in inventory.
    pub fn is_applied(&self) -> bool {
        self.status == RestockStatus::Completed
    }

    pub fn stock_delta(&self) -> StockDelta {
        self.items
            .iter()
            .map(|i| (i.product_id, i.restock_quantity))
            .collect()
    }

    pub fn ensure_transition(&self, next: RestockStatus) -> DomainResult<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "restock {} cannot move from {} to {}",
                self.id, self.status, next
            )))
        }
    }

    /// Mark the restock received. `changes` are the increments that applied it;
    /// previous quantities are re-snapshotted from them.
    pub fn complete(&mut self, at: DateTime<Utc>, changes: &[StockChange]) -> DomainResult<()> {
        self.ensure_transition(RestockStatus::Completed)?;
        for item in &mut self.items {
            if let Some(change) = changes.iter().find(|c| c.product_id == item.product_id) {
                item.previous_quantity = change.previous_quantity;
            }
        }
        self.status = RestockStatus::Completed;
        self.date_received = Some(at);
        self.version += 1;
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        self.ensure_transition(RestockStatus::Cancelled)?;
        self.status = RestockStatus::Cancelled;
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for Restock {
    type Id = RestockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
