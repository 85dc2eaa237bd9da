//! Helpers for exact decimal currency amounts.
//!
//! Amounts are stored as TEXT in SQLite and summed in Rust so that no
//! floating-point rounding can creep into balances or report totals.

use rusqlite::types::Type;
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Parse a TEXT column value into a [Decimal].
///
/// `column` is only used to report which column failed to convert.
pub(crate) fn decimal_from_sql(text: String, column: usize) -> Result<Decimal, rusqlite::Error> {
    text.parse::<Decimal>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error)))
}

/// The share of `whole` covered by `part`, rounded to the nearest whole
/// percent and capped at 100.
///
/// A zero `whole` yields 0 rather than a division error. Used for both
/// budget usage and goal progress.
pub(crate) fn percentage_of(part: Decimal, whole: Decimal) -> u8 {
    if whole == Decimal::ZERO {
        return 0;
    }

    let percent = part / whole * Decimal::ONE_HUNDRED;

    percent.round().to_i64().unwrap_or(0).clamp(0, 100) as u8
}

#[cfg(test)]
mod percentage_of_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::percentage_of;

    #[test]
    fn zero_whole_yields_zero() {
        assert_eq!(percentage_of(dec!(50), Decimal::ZERO), 0);
    }

    #[test]
    fn rounds_to_nearest_percent() {
        assert_eq!(percentage_of(dec!(333), dec!(1000)), 33);
        assert_eq!(percentage_of(dec!(336), dec!(1000)), 34);
    }

    #[test]
    fn caps_at_one_hundred() {
        assert_eq!(percentage_of(dec!(150), dec!(100)), 100);
    }

    #[test]
    fn exact_fraction_has_no_float_error() {
        // 1/3 of 3 cents is exactly 1 cent, 33%.
        assert_eq!(percentage_of(dec!(0.01), dec!(0.03)), 33);
    }
}
