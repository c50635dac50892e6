//! Payment reconciliation
//!
//! Decides how a provider outcome changes an order, given the order's
//! current state. Deciding from current state makes replayed and
//! out-of-order notifications harmless.

use crate::orders::{OrderStatus, PaymentStatus};

/// Outcome reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment captured.
    Succeeded,

    /// Payment declined, or the session expired unpaid.
    Failed,
}

/// State changes to apply for a provider outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTransition {
    /// New order status.
    pub order_status: OrderStatus,

    /// New payment status.
    pub payment_status: PaymentStatus,

    /// Return the order's units to stock.
    pub restore_stock: bool,

    /// Empty the customer's cart.
    pub clear_cart: bool,

    /// Money was captured for an order that is already cancelled.
    pub needs_refund: bool,
}

/// Why an outcome leaves the order untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The order already reflects this outcome.
    AlreadyApplied,

    /// A later outcome has already been recorded.
    Superseded,

    /// The order is closed and the outcome does not affect it.
    OrderClosed,
}

/// Result of reconciling an outcome against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Apply these changes.
    Apply(PaymentTransition),

    /// Leave the order as it is.
    Ignore(IgnoreReason),
}

/// Decide what a provider outcome does to an order.
pub fn reconcile(
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    outcome: PaymentOutcome,
) -> Reconciliation {
    match (outcome, payment_status) {
        (PaymentOutcome::Succeeded, PaymentStatus::Paid)
        | (PaymentOutcome::Failed, PaymentStatus::Failed) => {
            Reconciliation::Ignore(IgnoreReason::AlreadyApplied)
        }
        (PaymentOutcome::Succeeded, PaymentStatus::Refunded)
        | (PaymentOutcome::Failed, PaymentStatus::Paid | PaymentStatus::Refunded) => {
            Reconciliation::Ignore(IgnoreReason::Superseded)
        }
        (PaymentOutcome::Succeeded, PaymentStatus::Pending | PaymentStatus::Failed) => {
            let cancelled = order_status == OrderStatus::Cancelled;

            Reconciliation::Apply(PaymentTransition {
                order_status: if order_status == OrderStatus::Pending {
                    OrderStatus::Processing
                } else {
                    order_status
                },
                payment_status: PaymentStatus::Paid,
                restore_stock: false,
                clear_cart: !cancelled,
                needs_refund: cancelled,
            })
        }
        (PaymentOutcome::Failed, PaymentStatus::Pending) => {
            if order_status.is_terminal() {
                return Reconciliation::Ignore(IgnoreReason::OrderClosed);
            }

            Reconciliation::Apply(PaymentTransition {
                order_status: OrderStatus::Cancelled,
                payment_status: PaymentStatus::Failed,
                restore_stock: true,
                clear_cart: false,
                needs_refund: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_moves_pending_order_to_processing() {
        assert_eq!(
            reconcile(
                OrderStatus::Pending,
                PaymentStatus::Pending,
                PaymentOutcome::Succeeded
            ),
            Reconciliation::Apply(PaymentTransition {
                order_status: OrderStatus::Processing,
                payment_status: PaymentStatus::Paid,
                restore_stock: false,
                clear_cart: true,
                needs_refund: false,
            })
        );
    }

    #[test]
    fn replayed_success_is_ignored() {
        assert_eq!(
            reconcile(
                OrderStatus::Processing,
                PaymentStatus::Paid,
                PaymentOutcome::Succeeded
            ),
            Reconciliation::Ignore(IgnoreReason::AlreadyApplied)
        );
    }

    #[test]
    fn failure_cancels_and_restores_stock_once() {
        let first = reconcile(
            OrderStatus::Pending,
            PaymentStatus::Pending,
            PaymentOutcome::Failed,
        );

        assert!(
            matches!(first, Reconciliation::Apply(t) if t.restore_stock && t.order_status == OrderStatus::Cancelled),
            "expected a cancelling transition, got {first:?}"
        );

        assert_eq!(
            reconcile(
                OrderStatus::Cancelled,
                PaymentStatus::Failed,
                PaymentOutcome::Failed
            ),
            Reconciliation::Ignore(IgnoreReason::AlreadyApplied)
        );
    }

    #[test]
    fn failure_after_success_is_ignored() {
        assert_eq!(
            reconcile(
                OrderStatus::Processing,
                PaymentStatus::Paid,
                PaymentOutcome::Failed
            ),
            Reconciliation::Ignore(IgnoreReason::Superseded)
        );
    }

    #[test]
    fn success_after_expiry_records_payment_for_refund() {
        assert_eq!(
            reconcile(
                OrderStatus::Cancelled,
                PaymentStatus::Failed,
                PaymentOutcome::Succeeded
            ),
            Reconciliation::Apply(PaymentTransition {
                order_status: OrderStatus::Cancelled,
                payment_status: PaymentStatus::Paid,
                restore_stock: false,
                clear_cart: false,
                needs_refund: true,
            })
        );
    }

    #[test]
    fn failure_on_closed_unpaid_order_is_ignored() {
        assert_eq!(
            reconcile(
                OrderStatus::Cancelled,
                PaymentStatus::Pending,
                PaymentOutcome::Failed
            ),
            Reconciliation::Ignore(IgnoreReason::OrderClosed)
        );
    }

    #[test]
    fn success_does_not_move_fulfilment_backwards() {
        let result = reconcile(
            OrderStatus::Shipped,
            PaymentStatus::Pending,
            PaymentOutcome::Succeeded,
        );

        assert!(
            matches!(result, Reconciliation::Apply(t) if t.order_status == OrderStatus::Shipped),
            "expected shipped order to stay shipped, got {result:?}"
        );
    }
}
