use serde::{Deserialize, Serialize};

use storeledger_core::UserId;

/// Integer RBAC tier; higher levels may do more.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub u8);

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "level {}", self.0)
    }
}

/// The resolved identity behind a request.
///
/// `is_internal` marks staff accounts (as opposed to customers using the
/// storefront). Internal requesters bypass ownership checks and may set
/// non-default initial statuses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: UserId,
    pub access_level: AccessLevel,
    pub is_internal: bool,
}

impl Requester {
    pub fn internal(user_id: UserId, level: u8) -> Self {
        Self {
            user_id,
            access_level: AccessLevel(level),
            is_internal: true,
        }
    }

    pub fn external(user_id: UserId, level: u8) -> Self {
        Self {
            user_id,
            access_level: AccessLevel(level),
            is_internal: false,
        }
    }
}
