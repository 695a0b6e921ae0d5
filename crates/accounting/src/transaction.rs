use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storeledger_core::{OrderId, RefundId, RemovalId, RestockId, StoreId, TransactionId, UserId};

/// Kind of operation a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Sale,
    Refund,
    Restock,
    Removal,
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Refund => "refund",
            TransactionKind::Restock => "restock",
            TransactionKind::Removal => "removal",
        })
    }
}

/// The operation that owns a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "operation_id", rename_all = "lowercase")]
pub enum OperationRef {
    Sale(OrderId),
    Refund(RefundId),
    Restock(RestockId),
    Removal(RemovalId),
}

impl OperationRef {
    pub fn kind(&self) -> TransactionKind {
        match self {
            OperationRef::Sale(_) => TransactionKind::Sale,
            OperationRef::Refund(_) => TransactionKind::Refund,
            OperationRef::Restock(_) => TransactionKind::Restock,
            OperationRef::Removal(_) => TransactionKind::Removal,
        }
    }

    pub fn operation_id(&self) -> Uuid {
        match self {
            OperationRef::Sale(id) => (*id).into(),
            OperationRef::Refund(id) => (*id).into(),
            OperationRef::Restock(id) => (*id).into(),
            OperationRef::Removal(id) => (*id).into(),
        }
    }
}

impl core::fmt::Display for OperationRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.kind(), self.operation_id())
    }
}

/// Immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    operation: OperationRef,
    store_id: StoreId,
    requested_by: UserId,
    date: DateTime<Utc>,
}

impl Transaction {
    pub fn record(
        operation: OperationRef,
        store_id: StoreId,
        requested_by: UserId,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            operation,
            store_id,
            requested_by,
            date,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn operation(&self) -> OperationRef {
        self.operation
    }

    pub fn kind(&self) -> TransactionKind {
        self.operation.kind()
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Pagination parameters for ledger reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Cut one page out of an already ordered sequence.
    pub fn page<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items: Vec<T> = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        let has_more = (self.offset as u64) + (items.len() as u64) < total;
        Page {
            items,
            total,
            pagination: *self,
            has_more,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Filter criteria for ledger reads. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub store_id: Option<StoreId>,
    pub kind: Option<TransactionKind>,
    pub requested_by: Option<UserId>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub until: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.store_id.is_none_or(|s| s == tx.store_id)
            && self.kind.is_none_or(|k| k == tx.kind())
            && self.requested_by.is_none_or(|u| u == tx.requested_by)
            && self.from.is_none_or(|from| tx.date >= from)
            && self.until.is_none_or(|until| tx.date < until)
    }

    /// Apply the filter, order newest first and cut the requested page.
    pub fn select<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
        pagination: Pagination,
    ) -> Page<Transaction> {
        let mut matched: Vec<Transaction> = transactions
            .into_iter()
            .filter(|tx| self.matches(tx))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        pagination.page(matched)
    }
}
