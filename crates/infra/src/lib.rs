//! Infrastructure layer: storage, configuration and the ledger workflows.
//!
//! Domain crates describe what an operation does to an order, refund,
//! restock or removal. This crate runs those decisions against a store
//! inside one unit of work per request and records the ledger transaction
//! alongside.

pub mod config;
pub mod service;
pub mod store;
pub mod workflows;


pub use config::{ConfigError, LedgerConfig};
pub use service::RetailService;
pub use store::{InMemoryStore, InMemoryUnitOfWork, Store, StoreError, UnitOfWork};
pub use workflows::RequestContext;

/// Load configuration from the environment, install logging and build a
/// service over a fresh in-memory store.
pub fn bootstrap() -> Result<RetailService<InMemoryStore>, ConfigError> {
    let config = LedgerConfig::from_env()?;
    storeledger_observability::init(&config.log);
    tracing::info!(
        tax_rate = %config.tax_rate,
        refund_window_days = config.refund_window_days,
        "ledger configured"
    );
    Ok(RetailService::new(InMemoryStore::new(), config))
}
