use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use storeledger_core::money::{ensure_fraction, ensure_non_negative};
use storeledger_core::{Decimal, DomainError, DomainResult, ProductId};

/// Catalog product.
///
/// Products are never hard-deleted once referenced by an order or inventory
/// row; `delete` only flags them so historical line items stay resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Decimal,
    /// Maximum discount rate a cart line may carry (0..=1).
    discount_cap: Decimal,
    deleted: bool,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Decimal,
        discount_cap: Decimal,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        ensure_non_negative(price, "price")?;
        ensure_fraction(discount_cap, "discount cap")?;

        Ok(Self {
            id,
            name,
            price,
            discount_cap,
            deleted: false,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn discount_cap(&self) -> Decimal {
        self.discount_cap
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Logical delete.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    /// Whether the product may appear on a new cart line or be stocked.
    pub fn can_be_sold(&self) -> bool {
        !self.deleted
    }
}

/// Read-only catalog lookup consumed by the cart builder.
pub trait Catalog {
    fn product(&self, id: &ProductId) -> Option<&Product>;
}

impl Catalog for HashMap<ProductId, Product> {
    fn product(&self, id: &ProductId) -> Option<&Product> {
        self.get(id)
    }
}
