//! Cart / line-item builder.
//!
//! Turns requested lines into priced cart items plus order totals. Shared by
//! order creation and cart edits; it never touches inventory.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use storeledger_core::money::ensure_fraction;
use storeledger_core::{Decimal, DomainError, DomainResult, ProductId};
use storeledger_products::Catalog;

/// A requested cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Discount rate on the 0..=1 scale.
    pub discount: Decimal,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: i64, discount: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            discount,
        }
    }
}

/// A priced line stored on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub discount: Decimal,
    /// Catalog price when the line was built.
    pub unit_price: Decimal,
}

impl CartItem {
    pub fn line_amount(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn line_discount(&self) -> Decimal {
        self.line_amount() * self.discount
    }

    /// Price actually paid per unit.
    pub fn net_unit_price(&self) -> Decimal {
        self.unit_price * (Decimal::ONE - self.discount)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub amount: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
}

impl CartTotals {
    pub fn total(&self) -> Decimal {
        self.amount - self.discount + self.tax
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltCart {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

/// Price `lines` against `catalog`.
///
/// Per line: amount = price × quantity, discount = amount × rate,
/// tax = (amount − discount) × `tax_rate`. Totals are the sums.
pub fn build_cart<C: Catalog + ?Sized>(
    lines: &[CartLine],
    catalog: &C,
    tax_rate: Decimal,
) -> DomainResult<BuiltCart> {
    ensure_fraction(tax_rate, "tax rate")?;

    let mut seen = HashSet::with_capacity(lines.len());
    let mut items = Vec::with_capacity(lines.len());
    let mut totals = CartTotals::default();

    for line in lines {
        let product = catalog
            .product(&line.product_id)
            .filter(|p| p.can_be_sold())
            .ok_or_else(|| DomainError::not_found(format!("product {}", line.product_id)))?;

        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity for product {} must be positive, got {}",
                line.product_id, line.quantity
            )));
        }
        ensure_fraction(line.discount, "discount")?;
        if line.discount > product.discount_cap() {
            return Err(DomainError::validation(format!(
                "discount {} exceeds the cap of {} for product {}",
                line.discount,
                product.discount_cap(),
                line.product_id
            )));
        }
        if !seen.insert(line.product_id) {
            return Err(DomainError::validation(format!(
                "product {} appears on more than one line",
                line.product_id
            )));
        }

        let item = CartItem {
            product_id: line.product_id,
            quantity: line.quantity,
            discount: line.discount,
            unit_price: product.price(),
        };
        let amount = item.line_amount();
        let discount = item.line_discount();
        totals.amount += amount;
        totals.discount += discount;
        totals.tax += (amount - discount) * tax_rate;
        items.push(item);
    }

    Ok(BuiltCart { items, totals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use storeledger_products::Product;

    fn dec(value: i64, scale: u32) -> Decimal {
        Decimal::new(value, scale)
    }

    fn test_catalog() -> (HashMap<ProductId, Product>, ProductId, ProductId) {
        let (p1, p2) = (ProductId::new(), ProductId::new());
        let catalog = [
            (p1, Product::new(p1, "Kettle", dec(100, 0), dec(5, 1)).unwrap()),
            (p2, Product::new(p2, "Teapot", dec(50, 0), Decimal::ZERO).unwrap()),
        ]
        .into_iter()
        .collect();
        (catalog, p1, p2)
    }

    #[test]
    fn totals_follow_the_line_formula() {
        let (catalog, p1, p2) = test_catalog();
        let lines = [
            CartLine::new(p1, 3, dec(1, 1)),
            CartLine::new(p2, 2, Decimal::ZERO),
        ];

        let cart = build_cart(&lines, &catalog, dec(18, 2)).unwrap();

        // p1: 300 amount, 30 discount, 270 * 0.18 = 48.6 tax
        // p2: 100 amount, 0 discount, 18 tax
        assert_eq!(cart.totals.amount, dec(400, 0));
        assert_eq!(cart.totals.discount, dec(30, 0));
        assert_eq!(cart.totals.tax, dec(666, 1));
        assert_eq!(cart.totals.total(), dec(4366, 1));
        assert_eq!(cart.items[0].unit_price, dec(100, 0));
    }

    #[test]
    fn unknown_or_deleted_product_is_not_found() {
        let (mut catalog, p1, _) = test_catalog();
        let missing = [CartLine::new(ProductId::new(), 1, Decimal::ZERO)];
        assert!(matches!(
            build_cart(&missing, &catalog, dec(18, 2)),
            Err(DomainError::NotFound(_))
        ));

        if let Some(product) = catalog.get_mut(&p1) {
            product.delete();
        }
        let deleted = [CartLine::new(p1, 1, Decimal::ZERO)];
        assert!(matches!(
            build_cart(&deleted, &catalog, dec(18, 2)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn line_rules_are_validated() {
        let (catalog, p1, p2) = test_catalog();
        let rate = dec(18, 2);

        let zero_qty = [CartLine::new(p1, 0, Decimal::ZERO)];
        let over_cap = [CartLine::new(p2, 1, dec(1, 1))];
        let bad_rate = [CartLine::new(p1, 1, dec(12, 1))];
        let duplicate = [
            CartLine::new(p1, 1, Decimal::ZERO),
            CartLine::new(p1, 2, Decimal::ZERO),
        ];

        for lines in [&zero_qty[..], &over_cap[..], &bad_rate[..], &duplicate[..]] {
            match build_cart(lines, &catalog, rate) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_cart_builds_to_zero_totals() {
        let (catalog, _, _) = test_catalog();
        let cart = build_cart(&[], &catalog, dec(18, 2)).unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.totals, CartTotals::default());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: order totals equal the sum of the line totals.
            #[test]
            fn totals_are_the_sum_of_lines(
                specs in prop::collection::vec((1i64..100_000, 1i64..50, 0i64..=100), 1..8),
                rate in 0i64..=100,
            ) {
                let mut catalog = HashMap::new();
                let mut lines = Vec::new();
                for (cents, qty, pct) in &specs {
                    let id = ProductId::new();
                    catalog.insert(id, Product::new(id, "Item", dec(*cents, 2), Decimal::ONE).unwrap());
                    lines.push(CartLine::new(id, *qty, dec(*pct, 2)));
                }
                let tax_rate = dec(rate, 2);

                let cart = build_cart(&lines, &catalog, tax_rate).unwrap();

                let amount: Decimal = cart.items.iter().map(CartItem::line_amount).sum();
                let discount: Decimal = cart.items.iter().map(CartItem::line_discount).sum();
                let tax: Decimal = cart
                    .items
                    .iter()
                    .map(|i| (i.line_amount() - i.line_discount()) * tax_rate)
                    .sum();
                prop_assert_eq!(cart.totals.amount, amount);
                prop_assert_eq!(cart.totals.discount, discount);
                prop_assert_eq!(cart.totals.tax, tax);
                prop_assert!(cart.totals.discount <= cart.totals.amount);
            }
        }
    }
}
