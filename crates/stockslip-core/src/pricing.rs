//! # Pricing Resolver
//!
//! Turns a requested line into a [`PricedLine`]. Pure; no catalog access.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. base = basePrice ?? unitPrice ?? price ?? 0                         │
//! │                                                                         │
//! │  2. bulk  = 10.00 per unit  IF  type == Cover                           │
//! │                               AND coverType ∈ allow-list                │
//! │                               AND quantity ≥ 10                         │
//! │           = 0               otherwise                                   │
//! │                                                                         │
//! │  3. expected = base − bulk                                              │
//! │                                                                         │
//! │     supplied unit price present AND ≠ expected                          │
//! │        → unit = supplied,  per-unit discount = base − supplied,  manual │
//! │     else bulk > 0                                                       │
//! │        → unit = expected,  per-unit discount = bulk,             bulk   │
//! │     else                                                                │
//! │        → unit = base,      per-unit discount = 0,                none   │
//! │                                                                         │
//! │  4. discount = per-unit discount × quantity                             │
//! │     total    = unit × quantity                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A manual price above the base price produces a negative discount; it is
//! stored as-is.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::request::LineRequest;
use crate::types::{DiscountType, PricedLine, ProductType};

/// Cover types that qualify for the bulk discount.
pub const DEFAULT_BULK_COVER_TYPES: [&str; 3] =
    ["Aster Cover", "Without Aster Cover", "Calendar Cover"];

/// Quantity from which the bulk discount applies.
pub const DEFAULT_BULK_THRESHOLD: i64 = 10;

/// Per-unit bulk reduction (10.00).
pub const DEFAULT_BULK_DISCOUNT_CENTS: i64 = 1_000;

fn default_bulk_threshold() -> i64 {
    DEFAULT_BULK_THRESHOLD
}

fn default_bulk_discount_cents() -> i64 {
    DEFAULT_BULK_DISCOUNT_CENTS
}

fn default_bulk_cover_types() -> Vec<String> {
    DEFAULT_BULK_COVER_TYPES.iter().map(|s| s.to_string()).collect()
}

/// Tunable parameters of the bulk rule.
///
/// Loaded from the `[pricing]` section of the engine config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRules {
    #[serde(default = "default_bulk_threshold")]
    pub bulk_threshold: i64,

    #[serde(default = "default_bulk_discount_cents")]
    pub bulk_discount_cents: i64,

    #[serde(default = "default_bulk_cover_types")]
    pub bulk_cover_types: Vec<String>,
}

impl Default for PricingRules {
    fn default() -> Self {
        PricingRules {
            bulk_threshold: default_bulk_threshold(),
            bulk_discount_cents: default_bulk_discount_cents(),
            bulk_cover_types: default_bulk_cover_types(),
        }
    }
}

impl PricingRules {
    /// Whether `line` qualifies for the bulk discount.
    ///
    /// Cover types compare case-insensitively after trimming.
    pub fn is_bulk_eligible(&self, line: &LineRequest) -> bool {
        if line.product_type != Some(ProductType::Cover) || line.quantity < self.bulk_threshold {
            return false;
        }

        match line.cover_type.as_deref() {
            Some(cover) => {
                let cover = cover.trim();
                self.bulk_cover_types
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(cover))
            }
            None => false,
        }
    }

    /// Per-unit bulk reduction for `line` (zero when not eligible).
    pub fn bulk_discount(&self, line: &LineRequest) -> Money {
        if self.is_bulk_eligible(line) {
            Money::from_cents(self.bulk_discount_cents)
        } else {
            Money::zero()
        }
    }
}

/// Prices a single line.
///
/// The classification snapshot is taken from the request as given; callers
/// that resolved a catalog item merge its classification in first
/// (see [`LineRequest::with_catalog_classification`]).
pub fn price_line(line: &LineRequest, rules: &PricingRules) -> PricedLine {
    let supplied = line.supplied_unit_price_cents().map(Money::from_cents);
    let base = line
        .base_price_cents
        .map(Money::from_cents)
        .or(supplied)
        .unwrap_or_default();

    let bulk = rules.bulk_discount(line);
    let expected = base - bulk;

    let (unit, per_unit_discount, discount_type) = match supplied {
        Some(price) if price != expected => (price, base - price, DiscountType::Manual),
        _ if !bulk.is_zero() => (expected, bulk, DiscountType::Bulk),
        _ => (base, Money::zero(), DiscountType::None),
    };

    PricedLine {
        product_name: line.product_name.trim().to_string(),
        classification: line.classification(),
        quantity: line.quantity,
        base_price_cents: base.cents(),
        unit_price_cents: unit.cents(),
        discount_cents: per_unit_discount.multiply_quantity(line.quantity).cents(),
        discount_type,
        total_price_cents: unit.multiply_quantity(line.quantity).cents(),
    }
}

/// Prices every line, preserving order.
pub fn price_lines(lines: &[LineRequest], rules: &PricingRules) -> Vec<PricedLine> {
    lines.iter().map(|line| price_line(line, rules)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aster(quantity: i64) -> LineRequest {
        LineRequest {
            product_name: "Aster Cover Red".to_string(),
            quantity,
            base_price_cents: Some(10_000),
            product_type: Some(ProductType::Cover),
            cover_type: Some("Aster Cover".to_string()),
            ..LineRequest::default()
        }
    }

    #[test]
    fn test_bulk_discount_at_threshold() {
        let priced = price_line(&aster(10), &PricingRules::default());

        assert_eq!(priced.unit_price_cents, 9_000);
        assert_eq!(priced.discount_cents, 10_000);
        assert_eq!(priced.discount_type, DiscountType::Bulk);
        assert_eq!(priced.total_price_cents, 90_000);
    }

    #[test]
    fn test_no_discount_below_threshold() {
        let priced = price_line(&aster(9), &PricingRules::default());

        assert_eq!(priced.unit_price_cents, 10_000);
        assert_eq!(priced.discount_cents, 0);
        assert_eq!(priced.discount_type, DiscountType::None);
        assert_eq!(priced.total_price_cents, 90_000);
    }

    #[test]
    fn test_manual_price_beats_bulk() {
        let line = LineRequest {
            unit_price_cents: Some(9_500),
            ..aster(10)
        };
        let priced = price_line(&line, &PricingRules::default());

        assert_eq!(priced.unit_price_cents, 9_500);
        assert_eq!(priced.discount_cents, 5_000);
        assert_eq!(priced.discount_type, DiscountType::Manual);
        assert_eq!(priced.total_price_cents, 95_000);
    }

    #[test]
    fn test_supplied_price_equal_to_bulk_price_stays_bulk() {
        let line = LineRequest {
            unit_price_cents: Some(9_000),
            ..aster(12)
        };
        let priced = price_line(&line, &PricingRules::default());

        assert_eq!(priced.discount_type, DiscountType::Bulk);
        assert_eq!(priced.discount_cents, 12_000);
    }

    #[test]
    fn test_manual_price_below_threshold() {
        let line = LineRequest {
            price_cents: Some(8_000),
            ..aster(2)
        };
        let priced = price_line(&line, &PricingRules::default());

        assert_eq!(priced.discount_type, DiscountType::Manual);
        assert_eq!(priced.discount_cents, 4_000);
    }

    #[test]
    fn test_manual_price_above_base_gives_negative_discount() {
        let line = LineRequest {
            unit_price_cents: Some(11_000),
            ..aster(1)
        };
        let priced = price_line(&line, &PricingRules::default());

        assert_eq!(priced.discount_type, DiscountType::Manual);
        assert_eq!(priced.discount_cents, -1_000);
    }

    #[test]
    fn test_base_falls_back_to_supplied_then_zero() {
        let line = LineRequest {
            product_name: "Form A4".to_string(),
            quantity: 3,
            unit_price_cents: Some(500),
            ..LineRequest::default()
        };
        let priced = price_line(&line, &PricingRules::default());
        assert_eq!(priced.base_price_cents, 500);
        assert_eq!(priced.discount_type, DiscountType::None);
        assert_eq!(priced.total_price_cents, 1_500);

        let bare = LineRequest {
            product_name: "Freebie".to_string(),
            quantity: 1,
            ..LineRequest::default()
        };
        let priced = price_line(&bare, &PricingRules::default());
        assert_eq!(priced.base_price_cents, 0);
        assert_eq!(priced.total_price_cents, 0);
    }

    #[test]
    fn test_unlisted_cover_type_never_bulk() {
        let line = LineRequest {
            cover_type: Some("Leather Cover".to_string()),
            ..aster(50)
        };
        assert!(!PricingRules::default().is_bulk_eligible(&line));

        let plate = LineRequest {
            product_type: Some(ProductType::Plate),
            ..aster(50)
        };
        assert!(!PricingRules::default().is_bulk_eligible(&plate));
    }

    #[test]
    fn test_cover_type_match_ignores_case() {
        let line = LineRequest {
            cover_type: Some("calendar cover ".to_string()),
            ..aster(10)
        };
        assert!(PricingRules::default().is_bulk_eligible(&line));
    }

    #[test]
    fn test_custom_rules() {
        let rules = PricingRules {
            bulk_threshold: 5,
            bulk_discount_cents: 500,
            ..PricingRules::default()
        };
        let priced = price_line(&aster(5), &rules);
        assert_eq!(priced.unit_price_cents, 9_500);
        assert_eq!(priced.discount_cents, 2_500);
    }

    #[test]
    fn test_line_totals_sum() {
        let lines = vec![aster(10), aster(3)];
        let priced = price_lines(&lines, &PricingRules::default());
        let sum: i64 = priced.iter().map(|l| l.total_price_cents).sum();
        assert_eq!(sum, 90_000 + 30_000);
    }
}
