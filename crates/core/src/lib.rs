//! `storeledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use money::Decimal;
pub use id::{
    CustomerId, OrderId, ProductId, RefundId, RemovalId, RestockId, StoreId, TransactionId, UserId,
};
