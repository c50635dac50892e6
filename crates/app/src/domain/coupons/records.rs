//! Coupon Records

use jiff::Timestamp;
use storefront::coupons::{CouponDiscount, CouponTerms};

use crate::{domain::carts::records::CartUuid, uuids::TypedUuid};

/// Coupon UUID
pub type CouponUuid = TypedUuid<CouponRecord>;

/// Coupon Record
#[derive(Debug, Clone)]
pub struct CouponRecord {
    pub uuid: CouponUuid,
    pub code: String,
    pub discount: CouponDiscount,
    pub terms: CouponTerms,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Coupon Usage UUID
pub type CouponUsageUuid = TypedUuid<CouponUsageRecord>;

/// Coupon Usage Record
#[derive(Debug)]
pub struct CouponUsageRecord;

/// A coupon attached to a cart, with the discount it would give today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub cart_uuid: CartUuid,
    pub coupon_uuid: CouponUuid,
    pub code: String,
    pub cart_total: u64,
    pub discount: u64,
}
