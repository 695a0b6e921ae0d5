//! Inventory domain module.
//!
//! Per-(store, product) stock rows, the only functions allowed to change
//! their quantity, and the stock removal operation that consumes them.
//! Deterministic domain logic only (no IO, no storage).

pub mod primitives;
pub mod record;
pub mod removal;

pub use primitives::{
    InventoryRows, StockChange, StockDelta, decrement, increment, reverse, stock_delta,
};
pub use record::{InventoryKey, InventoryRecord};
pub use removal::{RemovalItem, RemovalReason, StockRemoval};
