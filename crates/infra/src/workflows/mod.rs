//! Ledger workflows.
//!
//! Every function here runs inside one [`UnitOfWork`](crate::store::UnitOfWork)
//! supplied by the caller. A workflow performs all of its rule checks before
//! the first write, changes stock only through the inventory primitives and
//! appends its ledger transaction through the same handle, so the caller's
//! commit publishes the operation and its transaction together or not at all.

pub mod inventory;
pub mod orders;
pub mod refunds;
pub mod removals;
pub mod restocks;
pub mod transactions;

use chrono::{DateTime, Utc};

use storeledger_auth::{Operation, Requester, authorize};
use storeledger_core::DomainResult;

use crate::config::LedgerConfig;

/// Who is asking, under which configuration, and when.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub requester: Requester,
    pub config: &'a LedgerConfig,
    pub now: DateTime<Utc>,
}

impl<'a> RequestContext<'a> {
    pub fn new(requester: Requester, config: &'a LedgerConfig, now: DateTime<Utc>) -> Self {
        Self {
            requester,
            config,
            now,
        }
    }

    pub fn authorize(&self, operation: Operation) -> DomainResult<()> {
        authorize(&self.requester, operation, &self.config.access)?;
        Ok(())
    }
}
