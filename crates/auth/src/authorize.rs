use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storeledger_core::{DomainError, UserId};

use crate::{AccessLevel, Operation, Requester};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("operation '{operation}' requires {required}, requester has {actual}")]
    InsufficientLevel {
        operation: Operation,
        required: AccessLevel,
        actual: AccessLevel,
    },

    #[error("requester does not own {0}")]
    NotOwner(String),

    #[error("only internal users may {0}")]
    InternalOnly(String),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Minimum access level per operation.
///
/// Operations missing from the map fall back to `default_level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    levels: HashMap<Operation, AccessLevel>,
    default_level: AccessLevel,
}

impl AccessPolicy {
    /// Policy that admits everyone (level 0 everywhere).
    pub fn open() -> Self {
        Self {
            levels: HashMap::new(),
            default_level: AccessLevel(0),
        }
    }

    pub fn with_level(mut self, operation: Operation, level: u8) -> Self {
        self.levels.insert(operation, AccessLevel(level));
        self
    }

    pub fn set_level(&mut self, operation: Operation, level: u8) {
        self.levels.insert(operation, AccessLevel(level));
    }

    pub fn required(&self, operation: Operation) -> AccessLevel {
        self.levels
            .get(&operation)
            .copied()
            .unwrap_or(self.default_level)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::open()
            .with_level(Operation::PlaceOrder, 1)
            .with_level(Operation::RequestRefund, 1)
            .with_level(Operation::ManageOrder, 2)
            .with_level(Operation::ReviewRefund, 2)
            .with_level(Operation::ReadInventory, 2)
            .with_level(Operation::ManageRestock, 3)
            .with_level(Operation::ManageRemoval, 3)
            .with_level(Operation::ManageInventory, 3)
            .with_level(Operation::ReadLedger, 3)
            .with_level(Operation::DeleteOrder, 4)
            .with_level(Operation::DeleteRefund, 4)
            .with_level(Operation::DeleteRestock, 4)
            .with_level(Operation::DeleteRemoval, 4)
    }
}

/// Check the requester's level against the policy.
///
/// - No IO
/// - No panics
pub fn authorize(
    requester: &Requester,
    operation: Operation,
    policy: &AccessPolicy,
) -> Result<(), AuthzError> {
    let required = policy.required(operation);
    if requester.access_level >= required {
        Ok(())
    } else {
        Err(AuthzError::InsufficientLevel {
            operation,
            required,
            actual: requester.access_level,
        })
    }
}

/// Internal requesters pass; everyone else must be the record owner.
pub fn ensure_owner(
    requester: &Requester,
    owner: Option<UserId>,
    what: impl Into<String>,
) -> Result<(), AuthzError> {
    if requester.is_internal || owner == Some(requester.user_id) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner(what.into()))
    }
}

pub fn ensure_internal(requester: &Requester, action: impl Into<String>) -> Result<(), AuthzError> {
    if requester.is_internal {
        Ok(())
    } else {
        Err(AuthzError::InternalOnly(action.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_below_minimum_is_rejected() {
        let policy = AccessPolicy::default();
        let clerk = Requester::internal(UserId::new(), 2);

        assert!(authorize(&clerk, Operation::ManageOrder, &policy).is_ok());
        match authorize(&clerk, Operation::ManageRestock, &policy) {
            Err(AuthzError::InsufficientLevel { required, actual, .. }) => {
                assert_eq!(required, AccessLevel(3));
                assert_eq!(actual, AccessLevel(2));
            }
            other => panic!("expected InsufficientLevel, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operations_fall_back_to_default_level() {
        let policy = AccessPolicy::open().with_level(Operation::ReadLedger, 5);
        let anyone = Requester::external(UserId::new(), 0);
        assert!(authorize(&anyone, Operation::PlaceOrder, &policy).is_ok());
        assert!(authorize(&anyone, Operation::ReadLedger, &policy).is_err());
    }

    #[test]
    fn ownership_is_waived_for_internal_users() {
        let owner = UserId::new();
        let customer = Requester::external(owner, 1);
        let stranger = Requester::external(UserId::new(), 1);
        let staff = Requester::internal(UserId::new(), 1);

        assert!(ensure_owner(&customer, Some(owner), "customer").is_ok());
        assert!(ensure_owner(&staff, Some(owner), "customer").is_ok());
        assert_eq!(
            ensure_owner(&stranger, Some(owner), "customer"),
            Err(AuthzError::NotOwner("customer".to_string()))
        );
    }

    #[test]
    fn authz_errors_surface_as_forbidden() {
        let err: DomainError = AuthzError::InternalOnly("set refund status".into()).into();
        assert_eq!(err.kind(), "forbidden");
    }
}
