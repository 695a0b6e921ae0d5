//! Accounting module (transaction ledger).
//!
//! Append-only audit records for every stock-moving operation, plus the
//! filter used to read them back. Pure domain logic only.

pub mod transaction;

pub use transaction::{
    OperationRef, Page, Pagination, Transaction, TransactionFilter, TransactionKind,
};
