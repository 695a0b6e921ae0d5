//! Purchasing domain module (restock orders).
//!
//! Business rules for restocking a store, implemented purely as deterministic
//! domain logic (no IO, no storage).

pub mod restock;

pub use restock::{Restock, RestockItem, RestockStatus};
