//! Checkout arithmetic: line totals, coupon discounts and order totals.
//!
//! Everything here is pure so the storefront can compute totals inside a
//! database transaction and tests can check the numbers without one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{RecordStatus, round_money};

/// How a coupon's value is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.coupon_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a percentage of the subtotal (0-100].
    Percentage,
    /// `value` is a fixed lira amount.
    Fixed,
}

/// Reasons a coupon definition is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRuleError {
    #[error("coupon value must be greater than zero")]
    NonPositiveValue,
    #[error("percentage coupons cannot exceed 100")]
    PercentageAboveHundred,
    #[error("coupon validity window ends before it starts")]
    InvertedWindow,
}

/// The computation part of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRule {
    pub kind: CouponKind,
    pub value: Decimal,
}

impl CouponRule {
    /// Build a rule, rejecting non-positive values and percentages above 100.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponRuleError`] describing the first violated constraint.
    pub fn new(kind: CouponKind, value: Decimal) -> Result<Self, CouponRuleError> {
        if value <= Decimal::ZERO {
            return Err(CouponRuleError::NonPositiveValue);
        }
        if kind == CouponKind::Percentage && value > Decimal::ONE_HUNDRED {
            return Err(CouponRuleError::PercentageAboveHundred);
        }
        Ok(Self { kind, value })
    }

    /// Discount granted on `subtotal`.
    ///
    /// Fixed discounts are not clamped to the subtotal, so a fixed coupon
    /// larger than the basket yields a negative order total.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        match self.kind {
            CouponKind::Percentage => round_money(subtotal * self.value / Decimal::ONE_HUNDRED),
            CouponKind::Fixed => round_money(self.value),
        }
    }
}

/// Redemption constraints stored alongside a coupon's rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponValidity {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
}

impl CouponValidity {
    /// Check the window ordering of a new coupon.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRuleError::InvertedWindow`] when `ends_at < starts_at`.
    pub fn check_window(
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), CouponRuleError> {
        if ends_at < starts_at {
            return Err(CouponRuleError::InvertedWindow);
        }
        Ok(())
    }

    /// Whether the coupon can be applied at `now`: active, inside the inclusive
    /// `[starts_at, ends_at]` window, and not past its usage limit.
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        let in_window = self.starts_at <= now && now <= self.ends_at;
        let under_limit = self.usage_limit.is_none_or(|limit| self.used_count < limit);
        self.status == RecordStatus::Active && in_window && under_limit
    }
}

/// One cart line priced at checkout time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Subtotal, discount and total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// `total = Σ(unit_price × quantity) − discount`, with no floor at zero.
    #[must_use]
    pub fn compute(lines: &[PricedLine], coupon: Option<&CouponRule>) -> Self {
        let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
        let discount = coupon.map_or(Decimal::ZERO, |rule| rule.discount_for(subtotal));
        Self {
            subtotal,
            discount,
            total: subtotal - discount,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(price: &str, quantity: i32) -> PricedLine {
        PricedLine {
            unit_price: dec(price),
            quantity,
        }
    }

    #[test]
    fn test_totals_without_coupon() {
        let totals = OrderTotals::compute(&[line("100", 2)], None);
        assert_eq!(totals.subtotal, dec("200.00"));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, dec("200.00"));
    }

    #[test]
    fn test_percentage_coupon() {
        let rule = CouponRule::new(CouponKind::Percentage, dec("10")).unwrap();
        let totals = OrderTotals::compute(&[line("100", 2)], Some(&rule));
        assert_eq!(totals.discount, dec("20.00"));
        assert_eq!(totals.total, dec("180.00"));
    }

    #[test]
    fn test_fixed_coupon_is_not_clamped() {
        let rule = CouponRule::new(CouponKind::Fixed, dec("250")).unwrap();
        let totals = OrderTotals::compute(&[line("100", 2)], Some(&rule));
        assert_eq!(totals.discount, dec("250"));
        assert_eq!(totals.total, dec("-50.00"));
    }

    #[test]
    fn test_multiple_lines_sum() {
        let totals = OrderTotals::compute(&[line("19.99", 3), line("5.50", 1)], None);
        assert_eq!(totals.subtotal, dec("65.47"));
    }

    #[test]
    fn test_percentage_discount_rounds_to_kurus() {
        let rule = CouponRule::new(CouponKind::Percentage, dec("15")).unwrap();
        // 15% of 33.33 = 4.9995
        assert_eq!(rule.discount_for(dec("33.33")), dec("5.00"));
    }

    #[test]
    fn test_rule_validation() {
        assert_eq!(
            CouponRule::new(CouponKind::Fixed, Decimal::ZERO),
            Err(CouponRuleError::NonPositiveValue)
        );
        assert_eq!(
            CouponRule::new(CouponKind::Percentage, dec("100.01")),
            Err(CouponRuleError::PercentageAboveHundred)
        );
        assert!(CouponRule::new(CouponKind::Fixed, dec("500")).is_ok());
    }

    fn validity(now: DateTime<Utc>) -> CouponValidity {
        CouponValidity {
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            status: RecordStatus::Active,
            usage_limit: None,
            used_count: 0,
        }
    }

    #[test]
    fn test_redeemable_inside_window() {
        let now = Utc::now();
        assert!(validity(now).is_redeemable_at(now));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc::now();
        let v = validity(now);
        assert!(v.is_redeemable_at(v.starts_at));
        assert!(v.is_redeemable_at(v.ends_at));
        assert!(!v.is_redeemable_at(v.ends_at + Duration::seconds(1)));
    }

    #[test]
    fn test_expired_or_removed_coupon_not_redeemable() {
        let now = Utc::now();
        let expired = CouponValidity {
            ends_at: now - Duration::hours(1),
            ..validity(now)
        };
        assert!(!expired.is_redeemable_at(now));

        let removed = CouponValidity {
            status: RecordStatus::Removed,
            ..validity(now)
        };
        assert!(!removed.is_redeemable_at(now));
    }

    #[test]
    fn test_usage_limit() {
        let now = Utc::now();
        let exhausted = CouponValidity {
            usage_limit: Some(3),
            used_count: 3,
            ..validity(now)
        };
        assert!(!exhausted.is_redeemable_at(now));

        let remaining = CouponValidity {
            used_count: 2,
            ..exhausted
        };
        assert!(remaining.is_redeemable_at(now));
    }

    #[test]
    fn test_check_window() {
        let now = Utc::now();
        assert!(CouponValidity::check_window(now, now).is_ok());
        assert_eq!(
            CouponValidity::check_window(now, now - Duration::minutes(1)),
            Err(CouponRuleError::InvertedWindow)
        );
    }
}
