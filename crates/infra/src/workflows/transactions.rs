//! Ledger reads. There is no write surface: transactions are appended by the
//! workflow that owns them.

use storeledger_accounting::{OperationRef, Page, Pagination, Transaction, TransactionFilter};
use storeledger_auth::Operation;
use storeledger_core::{DomainError, DomainResult, TransactionId};

use super::RequestContext;
use crate::store::UnitOfWork;

/// Newest first.
pub fn list_transactions<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    filter: &TransactionFilter,
    pagination: Pagination,
) -> DomainResult<Page<Transaction>> {
    ctx.authorize(Operation::ReadLedger)?;
    uow.transactions(filter, pagination)
}

pub fn get_transaction<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    id: TransactionId,
) -> DomainResult<Transaction> {
    ctx.authorize(Operation::ReadLedger)?;
    uow.transaction(id)?
        .ok_or_else(|| DomainError::not_found(format!("transaction {id}")))
}

/// The transaction recorded for `operation`, if it has one yet.
pub fn transaction_for<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    operation: OperationRef,
) -> DomainResult<Option<Transaction>> {
    ctx.authorize(Operation::ReadLedger)?;
    uow.transaction_for(operation)
}
