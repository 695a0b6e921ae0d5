//! Parties domain module (customers).
//!
//! Customer records are thin CRUD owned elsewhere; the ledger only needs to
//! know that a customer exists and which user account owns it.

pub mod customer;

pub use customer::{ContactInfo, Customer};
