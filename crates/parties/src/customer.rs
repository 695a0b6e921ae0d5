use serde::{Deserialize, Serialize};

use storeledger_core::{CustomerId, DomainError, DomainResult, UserId};

/// Contact information for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    /// User account that owns this record; walk-in customers have none.
    owner: Option<UserId>,
    name: String,
    contact: ContactInfo,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        owner: Option<UserId>,
        name: impl Into<String>,
        contact: ContactInfo,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        Ok(Self {
            id,
            owner,
            name,
            contact,
        })
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }
}
