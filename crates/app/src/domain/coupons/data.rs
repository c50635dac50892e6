//! Coupon Data

use jiff::Timestamp;
use storefront::coupons::CouponDiscount;

use crate::domain::coupons::records::CouponUuid;

/// New Coupon Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub uuid: CouponUuid,
    pub code: String,
    pub discount: CouponDiscount,
    pub min_order_value: Option<u64>,
    pub expires_at: Timestamp,
    pub is_active: bool,
    pub usage_limit: Option<u64>,
    pub usage_per_user: u64,
}
