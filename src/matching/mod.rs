//! Price-time priority matching
//!
//! The engine takes one order at a time, trades it against the opposite side
//! of its ticker's book and rests whatever is left.

mod engine;

pub use engine::Engine;

use rust_decimal::Decimal;

use crate::messages::Side;

/// Whether an order on `side` limited at `limit` can trade at `best`
pub fn crosses(side: Side, limit: Decimal, best: Decimal) -> bool {
    match side {
        Side::Buy => best <= limit,
        Side::Sell => best >= limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_crosses() {
        assert!(crosses(Side::Buy, dec!(10), dec!(10)));
        assert!(crosses(Side::Buy, dec!(10), dec!(9.5)));
        assert!(!crosses(Side::Buy, dec!(10), dec!(10.5)));
        assert!(crosses(Side::Sell, dec!(10), dec!(10)));
        assert!(crosses(Side::Sell, dec!(10), dec!(11)));
        assert!(!crosses(Side::Sell, dec!(10), dec!(9)));
    }
}
