//! Products domain module.
//!
//! The catalog is an external collaborator of the inventory ledger: the cart
//! builder only needs `product_id -> (price, discount cap)`. This crate holds
//! that contract plus the product record itself (no IO, no storage).

pub mod product;

pub use product::{Catalog, Product};
