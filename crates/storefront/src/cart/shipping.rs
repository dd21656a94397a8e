//! Weight-tiered shipping cost.
//!
//! | total weight (g)     | cost (₹) |
//! |----------------------|----------|
//! | `< 3000`             | 80       |
//! | `3000 ..< 7000`      | 110      |
//! | `7000 ..< 15000`     | 140      |
//! | `>= 15000`           | 140      |
//!
//! The top band deliberately repeats the 140 flat rate; bulk orders are not
//! charged more.

use rust_decimal::Decimal;
use serde::Serialize;

/// A weight-range to flat-fee mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShippingTier {
    /// Exclusive upper bound in grams; `None` for the open-ended top band.
    pub below_grams: Option<u64>,
    /// Flat fee in rupees.
    pub cost_rupees: u32,
}

impl ShippingTier {
    /// Fee as a decimal amount.
    #[must_use]
    pub fn cost(&self) -> Decimal {
        Decimal::from(self.cost_rupees)
    }

    const fn covers(&self, total_weight_grams: u64) -> bool {
        match self.below_grams {
            Some(limit) => total_weight_grams < limit,
            None => true,
        }
    }
}

const TOP_TIER: ShippingTier = ShippingTier {
    below_grams: None,
    cost_rupees: 140,
};

/// Tiers in ascending order; the last entry is the catch-all.
pub static SHIPPING_TIERS: [ShippingTier; 4] = [
    ShippingTier {
        below_grams: Some(3_000),
        cost_rupees: 80,
    },
    ShippingTier {
        below_grams: Some(7_000),
        cost_rupees: 110,
    },
    ShippingTier {
        below_grams: Some(15_000),
        cost_rupees: 140,
    },
    TOP_TIER,
];

/// Pick the tier covering `total_weight_grams`.
#[must_use]
pub fn tier_for_weight(total_weight_grams: u64) -> &'static ShippingTier {
    SHIPPING_TIERS
        .iter()
        .find(|tier| tier.covers(total_weight_grams))
        .unwrap_or(&TOP_TIER)
}

/// Shipping cost for a cart of the given total weight.
#[must_use]
pub fn shipping_cost_for_weight(total_weight_grams: u64) -> Decimal {
    tier_for_weight(total_weight_grams).cost()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(shipping_cost_for_weight(0), Decimal::from(80));
        assert_eq!(shipping_cost_for_weight(2_999), Decimal::from(80));
        assert_eq!(shipping_cost_for_weight(3_000), Decimal::from(110));
        assert_eq!(shipping_cost_for_weight(3_200), Decimal::from(110));
        assert_eq!(shipping_cost_for_weight(6_999), Decimal::from(110));
        assert_eq!(shipping_cost_for_weight(7_000), Decimal::from(140));
        assert_eq!(shipping_cost_for_weight(14_999), Decimal::from(140));
    }

    #[test]
    fn test_no_escalation_above_top_band() {
        assert_eq!(shipping_cost_for_weight(15_000), Decimal::from(140));
        assert_eq!(shipping_cost_for_weight(u64::MAX), Decimal::from(140));
        assert_eq!(tier_for_weight(15_000).below_grams, None);
    }
}
