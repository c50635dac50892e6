//! Coupons
//!
//! Eligibility rules and discount arithmetic for coupon codes.

use jiff::Timestamp;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a coupon discount.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CouponDiscountError {
    /// Percentage discounts must be between 0 and 100 inclusive.
    #[error("percentage must be between 0 and 100, got {0}")]
    PercentageOutOfRange(u8),

    /// The stored discount kind was not recognised.
    #[error("unknown discount kind")]
    UnknownKind,
}

/// Reasons a coupon cannot be used.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CouponRejection {
    /// The coupon has been switched off.
    #[error("coupon is inactive")]
    Inactive,

    /// The coupon expiry is not after the current instant.
    #[error("coupon has expired")]
    Expired,

    /// The global usage limit has been exhausted.
    #[error("coupon usage limit reached")]
    UsageLimitReached,

    /// The cart total is below the coupon's minimum order value.
    #[error("minimum order value of {minimum} required")]
    BelowMinimumOrderValue {
        /// Minimum cart total, in minor units.
        minimum: u64,
    },

    /// The user has already redeemed this coupon as often as allowed.
    #[error("coupon usage limit exceeded for this user")]
    PerUserLimitReached,
}

/// How a coupon reduces an order subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CouponDiscount {
    /// A whole-number percentage of the subtotal.
    PercentageOff {
        /// Percentage between 0 and 100.
        percentage: u8,
    },

    /// A fixed amount in minor units.
    AmountOff {
        /// Amount taken off the subtotal.
        amount: u64,
    },
}

impl CouponDiscount {
    /// Build a percentage discount, rejecting values above 100.
    ///
    /// # Errors
    ///
    /// Returns [`CouponDiscountError::PercentageOutOfRange`] when `percentage > 100`.
    pub fn percentage_off(percentage: u8) -> Result<Self, CouponDiscountError> {
        if percentage > 100 {
            return Err(CouponDiscountError::PercentageOutOfRange(percentage));
        }

        Ok(Self::PercentageOff { percentage })
    }

    /// Build a fixed amount discount.
    pub const fn amount_off(amount: u64) -> Self {
        Self::AmountOff { amount }
    }

    /// Rebuild a discount from its stored kind and value.
    ///
    /// # Errors
    ///
    /// Returns [`CouponDiscountError::UnknownKind`] for an unrecognised kind,
    /// or [`CouponDiscountError::PercentageOutOfRange`] for a bad percentage.
    pub fn from_parts(kind: &str, value: u64) -> Result<Self, CouponDiscountError> {
        match kind {
            "percentage_off" => {
                let percentage = u8::try_from(value)
                    .map_err(|_overflow| CouponDiscountError::PercentageOutOfRange(u8::MAX))?;

                Self::percentage_off(percentage)
            }
            "amount_off" => Ok(Self::amount_off(value)),
            _ => Err(CouponDiscountError::UnknownKind),
        }
    }

    /// Stored kind name.
    pub const fn kind_as_str(&self) -> &'static str {
        match self {
            Self::PercentageOff { .. } => "percentage_off",
            Self::AmountOff { .. } => "amount_off",
        }
    }

    /// Stored value: the percentage or the fixed amount.
    pub fn value(&self) -> u64 {
        match self {
            Self::PercentageOff { percentage } => u64::from(*percentage),
            Self::AmountOff { amount } => *amount,
        }
    }

    /// Amount taken off `subtotal`, never more than `subtotal`.
    ///
    /// Percentages round half away from zero to the nearest minor unit.
    pub fn discount_for(&self, subtotal: u64) -> u64 {
        let discount = match self {
            Self::PercentageOff { percentage } => Decimal::from(subtotal)
                .checked_mul(Decimal::from(*percentage))
                .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
                .map(|amount| amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
                .and_then(|amount| amount.to_u64())
                .unwrap_or(subtotal),
            Self::AmountOff { amount } => *amount,
        };

        discount.min(subtotal)
    }
}

/// The usage and validity terms of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponTerms {
    /// Whether the coupon can currently be used.
    pub is_active: bool,

    /// Coupon is valid only while `now < expires_at`.
    pub expires_at: Timestamp,

    /// Maximum number of redemptions across all users, if capped.
    pub usage_limit: Option<u64>,

    /// Number of redemptions so far.
    pub used_count: u64,

    /// Maximum number of redemptions per user.
    pub usage_per_user: u64,

    /// Minimum cart total required, if any.
    pub min_order_value: Option<u64>,
}

impl CouponTerms {
    /// Check the coupon is active, unexpired and below its global cap.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, in that order.
    pub fn check_availability(&self, now: Timestamp) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }

        if self.expires_at <= now {
            return Err(CouponRejection::Expired);
        }

        if let Some(limit) = self.usage_limit
            && self.used_count >= limit
        {
            return Err(CouponRejection::UsageLimitReached);
        }

        Ok(())
    }

    /// Check a cart total meets the coupon's minimum order value.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRejection::BelowMinimumOrderValue`] when it does not.
    pub fn check_cart_total(&self, cart_total: u64) -> Result<(), CouponRejection> {
        match self.min_order_value {
            Some(minimum) if cart_total < minimum => {
                Err(CouponRejection::BelowMinimumOrderValue { minimum })
            }
            _ => Ok(()),
        }
    }

    /// Check a user's previous redemptions are below the per-user cap.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRejection::PerUserLimitReached`] when they are not.
    pub fn check_user_redemptions(&self, redemptions: u64) -> Result<(), CouponRejection> {
        if redemptions >= self.usage_per_user {
            return Err(CouponRejection::PerUserLimitReached);
        }

        Ok(())
    }

    /// Run every check in order: availability, cart total, per-user usage.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn check_redemption(
        &self,
        now: Timestamp,
        cart_total: u64,
        redemptions: u64,
    ) -> Result<(), CouponRejection> {
        self.check_availability(now)?;
        self.check_cart_total(cart_total)?;
        self.check_user_redemptions(redemptions)
    }
}
