//! Money arithmetic for order totals.
//!
//! All amounts are `Decimal` in pounds (not pence). The shop only trades in
//! GBP, so there is no currency field on amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Symbol used when rendering amounts for people (emails, WhatsApp).
pub const CURRENCY_SYMBOL: &str = "£";

/// ISO 4217 code, used where output must stay ASCII (invoice PDF).
pub const CURRENCY_CODE: &str = "GBP";

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Total for one order line.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Render an amount as `£12.34`.
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!("{CURRENCY_SYMBOL}{}", format_amount(amount))
}

/// Render an amount with exactly two decimals and no symbol.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = round2(amount);
    rounded.rescale(2);
    rounded.to_string()
}

/// Subtotal, tax and grand total of an order.
///
/// Serialized with `rust_decimal`'s string representation so clients never
/// see float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals from `(unit_price, quantity)` lines.
    ///
    /// `tax = round2(subtotal * tax_rate)` and `total = subtotal + tax`.
    ///
    /// ```
    /// use exprz_core::OrderTotals;
    /// use rust_decimal::Decimal;
    ///
    /// let lines = [(Decimal::new(1000, 2), 2), (Decimal::new(550, 2), 1)];
    /// let totals = OrderTotals::compute(lines, Decimal::new(20, 2));
    /// assert_eq!(totals.subtotal, Decimal::new(2550, 2));
    /// assert_eq!(totals.tax, Decimal::new(510, 2));
    /// assert_eq!(totals.total, Decimal::new(3060, 2));
    /// ```
    #[must_use]
    pub fn compute<I>(lines: I, tax_rate: Decimal) -> Self
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let subtotal = round2(
            lines
                .into_iter()
                .map(|(price, qty)| line_total(price, qty))
                .sum(),
        );
        let tax = round2(subtotal * tax_rate);

        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_empty_order_is_zero() {
        let totals = OrderTotals::compute(Vec::new(), dec("0.20"));
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.125 * 0.20 = 0.025 -> 0.03
        let totals = OrderTotals::compute([(dec("0.125"), 1)], dec("0.20"));
        assert_eq!(totals.tax, dec("0.03"));
    }

    #[test]
    fn test_total_is_subtotal_plus_tax() {
        let totals = OrderTotals::compute(
            [(dec("4.99"), 3), (dec("12.50"), 2), (dec("0.01"), 7)],
            dec("0.20"),
        );
        assert_eq!(totals.subtotal, dec("40.04"));
        assert_eq!(totals.tax, dec("8.01"));
        assert_eq!(totals.total, dec("48.05"));
    }

    #[test]
    fn test_format_money_pads_to_two_decimals() {
        assert_eq!(format_money(dec("5")), "£5.00");
        assert_eq!(format_money(dec("5.5")), "£5.50");
        assert_eq!(format_money(dec("1234.567")), "£1234.57");
        assert_eq!(format_amount(dec("0")), "0.00");
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(dec("2.50"), 4), dec("10.00"));
        assert_eq!(line_total(dec("2.50"), 0), Decimal::ZERO);
    }
}
