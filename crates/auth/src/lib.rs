//! `storeledger-auth`: access-level gate for ledger operations.
//!
//! Token issuance and level derivation live upstream; this crate only
//! receives the resolved requester and compares it against a minimum level
//! per operation and against record ownership. No IO.

pub mod authorize;
pub mod permissions;
pub mod principal;

pub use authorize::{AccessPolicy, AuthzError, authorize, ensure_internal, ensure_owner};
pub use permissions::Operation;
pub use principal::{AccessLevel, Requester};
