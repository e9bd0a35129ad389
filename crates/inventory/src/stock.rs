use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksense_core::ProductId;

/// Upper bound for any stock level (four digits).
pub const MAX_STOCK: u32 = 9999;

/// Current stock for one product.
///
/// Created lazily on the first mutation; mutated exclusively through the
/// store's transactional update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    /// Invariant: `0 <= current_stock <= MAX_STOCK` at all times.
    pub current_stock: u32,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of applying a delta to a stock level.
///
/// Bounds rejections are data, not errors: callers match on the variant and
/// the store commits nothing for the rejecting cases.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockOutcome {
    /// The mutation was applied; carries the new stock value.
    Applied(u32),
    /// The mutation would have driven stock below zero.
    NegativeStock,
    /// The mutation would have driven stock above [`MAX_STOCK`].
    LimitExceeded,
}

impl StockOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StockOutcome::Applied(_))
    }
}

/// Apply `delta` to `current`, enforcing the stock bounds.
///
/// Pure policy shared by every store implementation; must be evaluated
/// inside the same transaction that performs the write.
pub fn checked_apply(current: u32, delta: i64) -> StockOutcome {
    let next = i64::from(current) + delta;
    if next < 0 {
        return StockOutcome::NegativeStock;
    }
    if next > i64::from(MAX_STOCK) {
        return StockOutcome::LimitExceeded;
    }
    StockOutcome::Applied(next as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_delta_is_applied() {
        assert_eq!(checked_apply(10, 5), StockOutcome::Applied(15));
    }

    #[test]
    fn negative_delta_is_applied() {
        assert_eq!(checked_apply(10, -10), StockOutcome::Applied(0));
    }

    #[test]
    fn going_below_zero_is_rejected() {
        assert_eq!(checked_apply(10, -11), StockOutcome::NegativeStock);
    }

    #[test]
    fn exceeding_the_limit_is_rejected() {
        assert_eq!(checked_apply(MAX_STOCK, 1), StockOutcome::LimitExceeded);
    }

    #[test]
    fn reaching_the_exact_limit_is_applied() {
        assert_eq!(checked_apply(MAX_STOCK - 1, 1), StockOutcome::Applied(MAX_STOCK));
    }

    #[test]
    fn zero_delta_is_a_no_op_apply() {
        assert_eq!(checked_apply(42, 0), StockOutcome::Applied(42));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: an applied outcome always lands inside the bounds.
            #[test]
            fn applied_outcome_stays_in_bounds(
                current in 0u32..=MAX_STOCK,
                delta in -20_000i64..=20_000i64,
            ) {
                if let StockOutcome::Applied(next) = checked_apply(current, delta) {
                    prop_assert!(next <= MAX_STOCK);
                    prop_assert_eq!(i64::from(next), i64::from(current) + delta);
                }
            }

            /// Property: the outcome is rejecting exactly when the sum leaves the bounds.
            #[test]
            fn rejections_match_the_bounds(
                current in 0u32..=MAX_STOCK,
                delta in -20_000i64..=20_000i64,
            ) {
                let sum = i64::from(current) + delta;
                let outcome = checked_apply(current, delta);
                if sum < 0 {
                    prop_assert_eq!(outcome, StockOutcome::NegativeStock);
                } else if sum > i64::from(MAX_STOCK) {
                    prop_assert_eq!(outcome, StockOutcome::LimitExceeded);
                } else {
                    prop_assert!(outcome.is_applied());
                }
            }
        }
    }
}
