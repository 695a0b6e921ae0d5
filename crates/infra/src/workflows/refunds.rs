//! Refund lifecycle.
//!
//! Stock only moves back when a refund reaches `Refunded`, and that is also
//! the only point where a refund transaction is written.

use serde::{Deserialize, Serialize};
use tracing::info;

use storeledger_accounting::{OperationRef, Page, Pagination, Transaction};
use storeledger_auth::{Operation, ensure_internal};
use storeledger_core::{
    AggregateRoot, Decimal, DomainError, DomainResult, ExpectedVersion, OrderId, RefundId, StoreId,
};
use storeledger_inventory::reverse;
use storeledger_sales::{
    NewRefund, Order, OrderStatus, Refund, RefundItem, RefundStatus, RefundTransition,
};

use super::RequestContext;
use super::orders::{ensure_order_owner, load_order};
use crate::store::UnitOfWork;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRefund {
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub items: Vec<RefundItem>,
    /// Computed from the order lines when absent.
    pub amount: Option<Decimal>,
    /// `Pending` when absent. Anything else is reserved for internal users.
    pub status: Option<RefundStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRefund {
    pub status: Option<RefundStatus>,
    pub reason: Option<String>,
}

fn load_refund<U: UnitOfWork + ?Sized>(uow: &U, id: RefundId) -> DomainResult<Refund> {
    uow.refund(id)?
        .ok_or_else(|| DomainError::not_found(format!("refund {id}")))
}

/// Mark the order refunded, hand the refunded quantities back and record the transaction.
fn settle<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    refund: &Refund,
    order: &mut Order,
) -> DomainResult<()> {
    order.mark_refunded()?;
    reverse(uow, refund.store_id(), &refund.stock_delta(), true)?;
    uow.append_transaction(Transaction::record(
        OperationRef::Refund(refund.id_typed()),
        refund.store_id(),
        ctx.requester.user_id,
        ctx.now,
    ))
}

/// Put an order waiting on a withdrawn refund back to `Received`.
fn reopen_order<U: UnitOfWork + ?Sized>(uow: &mut U, order_id: OrderId) -> DomainResult<()> {
    let Some(mut order) = uow.order(order_id)? else {
        return Ok(());
    };
    if order.status() != OrderStatus::ForRefund {
        return Ok(());
    }
    let expected = ExpectedVersion::Exact(order.version());
    order.reopen_after_refund()?;
    uow.save_order(&order, expected)
}

pub fn create_refund<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    cmd: CreateRefund,
) -> DomainResult<Refund> {
    ctx.authorize(Operation::RequestRefund)?;

    let mut order = load_order(uow, cmd.order_id)?;
    ensure_order_owner(uow, ctx, &order)?;

    let status = cmd.status.unwrap_or(RefundStatus::Pending);
    if status != RefundStatus::Pending {
        ensure_internal(&ctx.requester, format!("open a refund as {status}"))?;
    }

    let refund = Refund::apply(
        NewRefund {
            id: RefundId::new(),
            reason: cmd.reason,
            items: cmd.items,
            amount: cmd.amount,
            status,
            applied_at: ctx.now,
        },
        &order,
        ctx.config.refund_window(),
    )?;

    let order_expected = ExpectedVersion::Exact(order.version());
    if refund.status() == RefundStatus::Refunded {
        settle(uow, ctx, &refund, &mut order)?;
    } else {
        order.mark_for_refund()?;
    }
    uow.save_refund(&refund, ExpectedVersion::NoAggregate)?;
    uow.save_order(&order, order_expected)?;

    info!(
        operation = "create_refund",
        store_id = %refund.store_id(),
        refund_id = %refund.id_typed(),
        order_id = %order.id_typed(),
        status = %refund.status(),
        amount = %refund.amount(),
        "refund requested"
    );
    Ok(refund)
}

/// Change the status and/or reason of a refund.
///
/// Requesting the status the refund already has changes nothing, so a
/// resubmitted `Refunded` never moves stock or writes a transaction twice.
pub fn update_refund<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    refund_id: RefundId,
    cmd: UpdateRefund,
) -> DomainResult<Refund> {
    let mut refund = load_refund(uow, refund_id)?;

    // Withdrawing is open to the requester only while the refund is pending.
    let needs_reviewer = match cmd.status {
        Some(RefundStatus::Cancelled) => !matches!(
            refund.status(),
            RefundStatus::Pending | RefundStatus::Cancelled
        ),
        Some(_) => true,
        None => false,
    };
    match cmd.status {
        Some(status) if needs_reviewer => {
            ctx.authorize(Operation::ReviewRefund)?;
            ensure_internal(&ctx.requester, format!("move a refund to {status}"))?;
        }
        _ => {
            ctx.authorize(Operation::RequestRefund)?;
            if !ctx.requester.is_internal {
                let order = load_order(uow, refund.order_id())?;
                ensure_order_owner(uow, ctx, &order)?;
            }
        }
    }

    let loaded_version = refund.version();

    if let Some(status) = cmd.status {
        match refund.transition(status, ctx.now)? {
            RefundTransition::Unchanged => {}
            RefundTransition::Changed {
                to: RefundStatus::Refunded,
                ..
            } => {
                let mut order = load_order(uow, refund.order_id())?;
                let order_expected = ExpectedVersion::Exact(order.version());
                settle(uow, ctx, &refund, &mut order)?;
                uow.save_order(&order, order_expected)?;
            }
            RefundTransition::Changed {
                to: RefundStatus::Cancelled | RefundStatus::Rejected,
                ..
            } => reopen_order(uow, refund.order_id())?,
            RefundTransition::Changed { .. } => {}
        }
    }
    if let Some(reason) = cmd.reason {
        refund.set_reason(reason);
    }

    if refund.version() != loaded_version {
        uow.save_refund(&refund, ExpectedVersion::Exact(loaded_version))?;
        info!(
            operation = "update_refund",
            store_id = %refund.store_id(),
            refund_id = %refund_id,
            status = %refund.status(),
            "refund updated"
        );
    }
    Ok(refund)
}

/// Remove a refund record. Inventory is never touched here.
pub fn delete_refund<U: UnitOfWork + ?Sized>(
    uow: &mut U,
    ctx: &RequestContext<'_>,
    refund_id: RefundId,
) -> DomainResult<()> {
    ctx.authorize(Operation::DeleteRefund)?;

    let refund = load_refund(uow, refund_id)?;
    if !refund.status().is_terminal() {
        reopen_order(uow, refund.order_id())?;
    }
    uow.delete_refund(refund_id)?;

    info!(
        operation = "delete_refund",
        store_id = %refund.store_id(),
        refund_id = %refund_id,
        "refund deleted"
    );
    Ok(())
}

pub fn get_refund<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    refund_id: RefundId,
) -> DomainResult<Refund> {
    if ctx.requester.is_internal {
        ctx.authorize(Operation::ReviewRefund)?;
    }
    let refund = load_refund(uow, refund_id)?;
    if !ctx.requester.is_internal {
        let order = load_order(uow, refund.order_id())?;
        ensure_order_owner(uow, ctx, &order)?;
    }
    Ok(refund)
}

pub fn list_refunds<U: UnitOfWork + ?Sized>(
    uow: &U,
    ctx: &RequestContext<'_>,
    store_id: StoreId,
    pagination: Pagination,
) -> DomainResult<Page<Refund>> {
    ctx.authorize(Operation::ReviewRefund)?;
    uow.refunds(store_id, pagination)
}
