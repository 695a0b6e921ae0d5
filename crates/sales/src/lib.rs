//! Sales domain module.
//!
//! Cart pricing, the order lifecycle and refund applications. Pure domain
//! logic: inventory effects are described here (as stock deltas) and applied
//! by the workflows in `storeledger-infra`.

pub mod cart;
pub mod order;
pub mod refund;

pub use cart::{BuiltCart, CartItem, CartLine, CartTotals, build_cart};
pub use order::{NewOrder, Order, OrderMode, OrderStatus};
pub use refund::{NewRefund, Refund, outstanding_stock, RefundItem, RefundStatus, RefundTransition};
