//! Storefront
//!
//! Storefront is the pure rule set behind a shop's cart, order and payment
//! flow: charge arithmetic, coupon eligibility, the order status machine and
//! payment-provider reconciliation. It performs no I/O.

pub mod charges;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod prelude;
