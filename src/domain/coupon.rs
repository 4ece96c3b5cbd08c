//! Coupon validation and discount computation.
//!
//! Validation never mutates `used_count`; the increment happens in the
//! order-placement transaction so repeated validation calls (a user retyping
//! the code) are never double-counted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Stored upper-cased; matched case-insensitively.
    pub code: String,
    pub discount_type: DiscountType,
    /// 0..=100 when `discount_type` is percentage, a flat amount otherwise.
    pub discount_value: f64,
    pub min_purchase_amount: f64,
    /// Cap on the computed discount; only meaningful for percentage coupons.
    pub max_discount_amount: Option<f64>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Rejection reasons, in the order they are checked. The first failure wins
/// so the user always sees a stable message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouponError {
    #[error("This coupon is no longer active")]
    Inactive,

    #[error("This coupon has expired")]
    Expired,

    #[error("A minimum purchase of ₹{min:.2} is required for this coupon")]
    MinPurchaseNotMet { min: f64 },

    #[error("This coupon has reached its usage limit")]
    LimitReached,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCoupon {
    pub coupon: Coupon,
    pub discount_amount: f64,
}

impl Coupon {
    /// Raw discount for a given subtotal, capped at the subtotal so a coupon
    /// never exceeds the cart value. Formula only; eligibility is
    /// [`validate`]'s job.
    pub fn discount_amount(&self, subtotal: f64) -> f64 {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let raw = subtotal * self.discount_value / 100.0;
                match self.max_discount_amount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::Fixed => self.discount_value,
        };
        raw.min(subtotal)
    }
}

/// Check a coupon against its time/usage/amount constraints and compute the
/// discount it yields for `subtotal`.
pub fn validate(
    coupon: &Coupon,
    subtotal: f64,
    now: DateTime<Utc>,
) -> Result<ValidatedCoupon, CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive);
    }

    if now < coupon.valid_from {
        return Err(CouponError::Expired);
    }
    if let Some(valid_until) = coupon.valid_until
        && now > valid_until
    {
        return Err(CouponError::Expired);
    }

    if subtotal < coupon.min_purchase_amount {
        return Err(CouponError::MinPurchaseNotMet {
            min: coupon.min_purchase_amount,
        });
    }

    if let Some(limit) = coupon.usage_limit
        && coupon.used_count >= limit
    {
        return Err(CouponError::LimitReached);
    }

    Ok(ValidatedCoupon {
        discount_amount: coupon.discount_amount(subtotal),
        coupon: coupon.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn make_coupon(discount_type: DiscountType, discount_value: f64) -> Coupon {
        Coupon {
            code: "MILK20".into(),
            discount_type,
            discount_value,
            min_purchase_amount: 0.0,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: now() - Duration::days(7),
            valid_until: Some(now() + Duration::days(7)),
            is_active: true,
        }
    }

    #[test]
    fn percentage_discount_with_cap() {
        // Scenario B: subtotal 500, 20% capped at 80 -> discount 80
        let mut coupon = make_coupon(DiscountType::Percentage, 20.0);
        coupon.max_discount_amount = Some(80.0);

        let validated = validate(&coupon, 500.0, now()).unwrap();
        assert_eq!(validated.discount_amount, 80.0);
    }

    #[test]
    fn percentage_discount_without_cap() {
        let coupon = make_coupon(DiscountType::Percentage, 20.0);
        let validated = validate(&coupon, 500.0, now()).unwrap();
        assert_eq!(validated.discount_amount, 100.0);
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        // Scenario C: fixed 1000 against subtotal 300 -> discount 300
        let coupon = make_coupon(DiscountType::Fixed, 1000.0);
        let validated = validate(&coupon, 300.0, now()).unwrap();
        assert_eq!(validated.discount_amount, 300.0);
    }

    #[test]
    fn expired_coupon_rejected_regardless_of_other_fields() {
        // Scenario D: valid_until in the past
        let mut coupon = make_coupon(DiscountType::Percentage, 50.0);
        coupon.valid_until = Some(now() - Duration::days(1));

        assert_eq!(validate(&coupon, 500.0, now()), Err(CouponError::Expired));
    }

    #[test]
    fn not_yet_valid_coupon_rejected() {
        let mut coupon = make_coupon(DiscountType::Fixed, 50.0);
        coupon.valid_from = now() + Duration::days(1);
        coupon.valid_until = None;

        assert_eq!(validate(&coupon, 500.0, now()), Err(CouponError::Expired));
    }

    #[test]
    fn inactive_wins_over_every_other_failure() {
        let mut coupon = make_coupon(DiscountType::Fixed, 50.0);
        coupon.is_active = false;
        coupon.valid_until = Some(now() - Duration::days(1));
        coupon.min_purchase_amount = 10_000.0;
        coupon.usage_limit = Some(1);
        coupon.used_count = 1;

        assert_eq!(validate(&coupon, 500.0, now()), Err(CouponError::Inactive));
    }

    #[test]
    fn min_purchase_checked_before_usage_limit() {
        let mut coupon = make_coupon(DiscountType::Fixed, 50.0);
        coupon.min_purchase_amount = 1_000.0;
        coupon.usage_limit = Some(1);
        coupon.used_count = 1;

        assert_eq!(
            validate(&coupon, 500.0, now()),
            Err(CouponError::MinPurchaseNotMet { min: 1_000.0 })
        );
    }

    #[test]
    fn usage_limit_reached() {
        let mut coupon = make_coupon(DiscountType::Fixed, 50.0);
        coupon.usage_limit = Some(100);
        coupon.used_count = 100;

        assert_eq!(
            validate(&coupon, 500.0, now()),
            Err(CouponError::LimitReached)
        );
    }

    #[test]
    fn validation_does_not_mutate_used_count() {
        let coupon = make_coupon(DiscountType::Fixed, 50.0);
        let validated = validate(&coupon, 500.0, now()).unwrap();
        assert_eq!(validated.coupon.used_count, coupon.used_count);
    }
}
