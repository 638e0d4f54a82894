//! Precision-aware amount comparison
//!
//! Monetary equality is always tested at the currency's minor-unit
//! resolution. Two amounts that render identically on a bank statement
//! must compare equal even if their exact decimal representations differ
//! (e.g. a sum of part-payments carrying extra scale).

use bigdecimal::rounding::RoundingMode;
use bigdecimal::BigDecimal;

use crate::types::Currency;

/// Round `amount` to `decimal_places` using half-up rounding
pub fn round_to_precision(amount: &BigDecimal, decimal_places: i64) -> BigDecimal {
    amount.with_scale_round(decimal_places, RoundingMode::HalfUp)
}

/// Compare two amounts at the given currency's precision
pub fn amounts_equal(a: &BigDecimal, b: &BigDecimal, currency: &Currency) -> bool {
    round_to_precision(a, currency.decimal_places) == round_to_precision(b, currency.decimal_places)
}
