//! Storefront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    charges::{ChargeSchedule, ChargesError, OrderCharges, line_total, subtotal},
    coupons::{CouponDiscount, CouponDiscountError, CouponRejection, CouponTerms},
    orders::{
        CancellationPlan, CancellationRejection, OrderStatus, Page, PaymentMethod, PaymentStatus,
        TransitionError, UnknownVariant, plan_cancellation,
    },
    payments::{
        IgnoreReason, PaymentObject, PaymentOutcome, PaymentTransition, ProviderEvent,
        ProviderEventKind, Reconciliation, RefundRejection, WebhookError, check_refund,
        construct_event, reconcile,
    },
};
