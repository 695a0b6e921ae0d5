//! Ledger configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `STORELEDGER_TAX_RATE` - tax rate on the 0..=1 scale (default: 0.18)
//! - `STORELEDGER_REFUND_WINDOW_DAYS` - days after receipt a refund may be requested (default: 15)
//! - `STORELEDGER_LOG_FORMAT` - `json` or `compact` (default: json)
//! - `STORELEDGER_LOG_FILTER` - filter used when `RUST_LOG` is unset (default: info)
//! - `STORELEDGER_LEVEL_<OPERATION>` - minimum access level for an operation,
//!   e.g. `STORELEDGER_LEVEL_MANAGE_RESTOCK=3`

use chrono::Duration;
use thiserror::Error;

use storeledger_auth::{AccessPolicy, Operation};
use storeledger_core::Decimal;
use storeledger_observability::{LogConfig, LogFormat};

const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);
const DEFAULT_REFUND_WINDOW_DAYS: u32 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub tax_rate: Decimal,
    pub refund_window_days: u32,
    pub access: AccessPolicy,
    pub log: LogConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            refund_window_days: DEFAULT_REFUND_WINDOW_DAYS,
            access: AccessPolicy::default(),
            log: LogConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("STORELEDGER_TAX_RATE") {
            config.tax_rate = parse("STORELEDGER_TAX_RATE", &raw)?;
        }
        if let Some(raw) = lookup("STORELEDGER_REFUND_WINDOW_DAYS") {
            config.refund_window_days = parse("STORELEDGER_REFUND_WINDOW_DAYS", &raw)?;
        }
        if let Some(raw) = lookup("STORELEDGER_LOG_FORMAT") {
            config.log.format = parse::<LogFormat>("STORELEDGER_LOG_FORMAT", &raw)?;
        }
        if let Some(raw) = lookup("STORELEDGER_LOG_FILTER") {
            config.log.default_filter = raw;
        }
        for operation in Operation::ALL {
            let key = level_key(operation);
            if let Some(raw) = lookup(&key) {
                config.access.set_level(operation, parse(&key, &raw)?);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "STORELEDGER_TAX_RATE".to_string(),
                format!("{} is outside 0..=1", self.tax_rate),
            ));
        }
        if self.refund_window_days == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STORELEDGER_REFUND_WINDOW_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn refund_window(&self) -> Duration {
        Duration::days(i64::from(self.refund_window_days))
    }
}

fn level_key(operation: Operation) -> String {
    format!("STORELEDGER_LEVEL_{}", operation.as_str().to_ascii_uppercase())
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.tax_rate, Decimal::new(18, 2));
        assert_eq!(config.refund_window(), Duration::days(15));
    }

    #[test]
    fn variables_override_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("STORELEDGER_TAX_RATE", "0.05"),
            ("STORELEDGER_REFUND_WINDOW_DAYS", "30"),
            ("STORELEDGER_LOG_FORMAT", "compact"),
            ("STORELEDGER_LEVEL_READ_LEDGER", "5"),
        ]))
        .unwrap();

        assert_eq!(config.tax_rate, Decimal::new(5, 2));
        assert_eq!(config.refund_window_days, 30);
        assert_eq!(config.log.format, LogFormat::Compact);
        assert_eq!(config.access.required(Operation::ReadLedger).0, 5);
        assert_eq!(config.access.required(Operation::PlaceOrder).0, 1);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        for (key, value) in [
            ("STORELEDGER_TAX_RATE", "abc"),
            ("STORELEDGER_TAX_RATE", "1.5"),
            ("STORELEDGER_REFUND_WINDOW_DAYS", "0"),
            ("STORELEDGER_LOG_FORMAT", "xml"),
            ("STORELEDGER_LEVEL_DELETE_ORDER", "-1"),
        ] {
            match LedgerConfig::from_lookup(lookup(&[(key, value)])) {
                Err(ConfigError::InvalidEnvVar(name, _)) => assert_eq!(name, key),
                other => panic!("expected error for {key}={value}, got {other:?}"),
            }
        }
    }
}
