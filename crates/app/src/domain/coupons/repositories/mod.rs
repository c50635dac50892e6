//! Coupon Repositories

mod coupons;
mod usages;

pub(crate) use coupons::PgCouponsRepository;
pub(crate) use usages::PgCouponUsagesRepository;
