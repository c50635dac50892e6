//! Coupon request and response bodies.

use salvo::{oapi::ToSchema, prelude::StatusError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront::coupons::CouponDiscount;
use storefront_app::domain::coupons::records::{AppliedCoupon, CouponRecord};

/// Coupon Discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum DiscountBody {
    /// A whole-number percentage of the subtotal, 0 to 100
    PercentageOff { percentage: u8 },

    /// A fixed amount in minor units
    AmountOff { amount: u64 },
}

impl DiscountBody {
    pub(crate) fn try_into_discount(self) -> Result<CouponDiscount, StatusError> {
        match self {
            Self::PercentageOff { percentage } => CouponDiscount::percentage_off(percentage)
                .map_err(|error| StatusError::bad_request().brief(error.to_string())),
            Self::AmountOff { amount } => Ok(CouponDiscount::amount_off(amount)),
        }
    }
}

impl From<CouponDiscount> for DiscountBody {
    fn from(discount: CouponDiscount) -> Self {
        match discount {
            CouponDiscount::PercentageOff { percentage } => Self::PercentageOff { percentage },
            CouponDiscount::AmountOff { amount } => Self::AmountOff { amount },
        }
    }
}

/// Coupon Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CouponResponse {
    pub uuid: Uuid,
    pub code: String,
    pub discount: DiscountBody,
    pub min_order_value: Option<u64>,
    pub expires_at: String,
    pub is_active: bool,
    pub usage_limit: Option<u64>,
    pub used_count: u64,
    pub usage_per_user: u64,
    pub created_at: String,
}

impl From<CouponRecord> for CouponResponse {
    fn from(coupon: CouponRecord) -> Self {
        Self {
            uuid: coupon.uuid.into(),
            code: coupon.code,
            discount: coupon.discount.into(),
            min_order_value: coupon.terms.min_order_value,
            expires_at: coupon.terms.expires_at.to_string(),
            is_active: coupon.terms.is_active,
            usage_limit: coupon.terms.usage_limit,
            used_count: coupon.terms.used_count,
            usage_per_user: coupon.terms.usage_per_user,
            created_at: coupon.created_at.to_string(),
        }
    }
}

/// Applied Coupon Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AppliedCouponResponse {
    /// Cart the coupon is attached to
    pub cart_uuid: Uuid,

    pub coupon_uuid: Uuid,

    pub code: String,

    /// Cart total before the discount
    pub cart_total: u64,

    /// Discount the order will get at the current cart total
    pub discount: u64,
}

impl From<AppliedCoupon> for AppliedCouponResponse {
    fn from(applied: AppliedCoupon) -> Self {
        Self {
            cart_uuid: applied.cart_uuid.into(),
            coupon_uuid: applied.coupon_uuid.into(),
            code: applied.code,
            cart_total: applied.cart_total,
            discount: applied.discount,
        }
    }
}
