//! Monetary amounts and fractional rates.
//!
//! Amounts are exact decimals. Rates (discounts, tax, discount caps) are
//! fractions on the 0..=1 scale.

pub use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Reject a rate outside `0..=1`.
pub fn ensure_fraction(value: Decimal, what: &str) -> DomainResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(DomainError::validation(format!(
            "{what} must be between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

/// Reject a negative amount.
pub fn ensure_non_negative(value: Decimal, what: &str) -> DomainResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::validation(format!(
            "{what} cannot be negative, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_bounds_are_inclusive() {
        assert!(ensure_fraction(Decimal::ZERO, "discount").is_ok());
        assert!(ensure_fraction(Decimal::ONE, "discount").is_ok());
        assert!(ensure_fraction(Decimal::new(11, 1), "discount").is_err());
        assert!(ensure_fraction(Decimal::new(-1, 2), "discount").is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(ensure_non_negative(Decimal::new(-1, 0), "price").is_err());
        assert!(ensure_non_negative(Decimal::ZERO, "price").is_ok());
    }
}
