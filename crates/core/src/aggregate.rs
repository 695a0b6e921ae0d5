//! Aggregate root trait and optimistic version checks.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Every persisted operation (order, refund, restock, removal) and every
/// inventory row is an aggregate root. The store compares `version()` on save
/// so that a write based on a stale read is rejected instead of silently
/// overwriting a concurrent change.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Starts at 1 for a freshly created aggregate and is bumped by one on
    /// every state change.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate must not exist yet.
    NoAggregate,
    /// Skip version checking.
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation for saving `current` after one state change was applied.
    pub fn after_change(new_version: u64) -> Self {
        match new_version {
            0 | 1 => ExpectedVersion::NoAggregate,
            v => ExpectedVersion::Exact(v - 1),
        }
    }

    /// `actual` is `None` when the aggregate is not stored.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Any, _) => true,
            (ExpectedVersion::NoAggregate, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_change_expects_previous_version() {
        assert_eq!(ExpectedVersion::after_change(1), ExpectedVersion::NoAggregate);
        assert_eq!(ExpectedVersion::after_change(3), ExpectedVersion::Exact(2));
    }

    #[test]
    fn stale_version_is_a_conflict() {
        assert!(ExpectedVersion::Exact(2).check(Some(2)).is_ok());
        assert!(ExpectedVersion::NoAggregate.check(None).is_ok());
        match ExpectedVersion::Exact(2).check(Some(3)) {
            Err(DomainError::Conflict(_)) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(ExpectedVersion::NoAggregate.check(Some(1)).is_err());
    }
}
