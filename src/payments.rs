//! Payments
//!
//! Provider-independent payment rules: webhook verification, event decoding,
//! reconciliation and refund eligibility.

use jiff::{SignedDuration, Timestamp};
use thiserror::Error;

use crate::orders::{OrderStatus, PaymentMethod, PaymentStatus};

pub mod events;
pub mod reconcile;
pub mod signature;

pub use events::{EventError, PaymentObject, ProviderEvent, ProviderEventKind};
pub use reconcile::{IgnoreReason, PaymentOutcome, PaymentTransition, Reconciliation, reconcile};
pub use signature::SignatureError;

/// Errors raised while accepting a webhook notification.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The signature did not verify.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The payload could not be decoded.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Verify a webhook signature and decode its payload.
///
/// Nothing is decoded unless the signature verifies.
///
/// # Errors
///
/// Returns [`WebhookError::Signature`] for an invalid signature and
/// [`WebhookError::Event`] for an undecodable payload.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: Timestamp,
    tolerance: SignedDuration,
) -> Result<ProviderEvent, WebhookError> {
    signature::verify(payload, header, secret, now, tolerance)?;

    Ok(ProviderEvent::from_slice(payload)?)
}

/// Why an order cannot be refunded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RefundRejection {
    /// Cash orders are never charged through the provider.
    #[error("cash on delivery orders cannot be refunded")]
    CashOnDelivery,

    /// Nothing has been captured.
    #[error("payment not completed")]
    PaymentNotCompleted,

    /// The order has no provider payment to refund against.
    #[error("no provider payment reference found for this order")]
    MissingPaymentReference,

    /// Delivered orders are outside the refund flow.
    #[error("delivered orders cannot be refunded")]
    OrderDelivered,
}

/// Check an order can be refunded through the provider.
///
/// # Errors
///
/// Returns the first failing [`RefundRejection`].
pub fn check_refund(
    method: PaymentMethod,
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    payment_reference: Option<&str>,
) -> Result<(), RefundRejection> {
    if !method.uses_provider() {
        return Err(RefundRejection::CashOnDelivery);
    }

    if payment_status != PaymentStatus::Paid {
        return Err(RefundRejection::PaymentNotCompleted);
    }

    if payment_reference.is_none_or(str::is_empty) {
        return Err(RefundRejection::MissingPaymentReference);
    }

    if order_status == OrderStatus::Delivered {
        return Err(RefundRejection::OrderDelivered);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn construct_event_verifies_before_decoding() -> TestResult {
        let now = Timestamp::now();
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1" } }
        })
        .to_string();

        let header = signature::sign(payload.as_bytes(), "whsec", now)?;

        let event = construct_event(
            payload.as_bytes(),
            &header,
            "whsec",
            now,
            signature::DEFAULT_TOLERANCE,
        )?;

        assert_eq!(event.id, "evt_1");

        let rejected = construct_event(
            b"{not json",
            &header,
            "whsec",
            now,
            signature::DEFAULT_TOLERANCE,
        );

        assert!(
            matches!(rejected, Err(WebhookError::Signature(SignatureError::Mismatch))),
            "expected signature mismatch, got {rejected:?}"
        );

        Ok(())
    }

    #[test]
    fn refund_checks_run_in_order() {
        assert_eq!(
            check_refund(
                PaymentMethod::CashOnDelivery,
                PaymentStatus::Pending,
                OrderStatus::Processing,
                None
            ),
            Err(RefundRejection::CashOnDelivery)
        );
        assert_eq!(
            check_refund(
                PaymentMethod::Card,
                PaymentStatus::Pending,
                OrderStatus::Pending,
                Some("pi_1")
            ),
            Err(RefundRejection::PaymentNotCompleted)
        );
        assert_eq!(
            check_refund(
                PaymentMethod::Card,
                PaymentStatus::Paid,
                OrderStatus::Processing,
                None
            ),
            Err(RefundRejection::MissingPaymentReference)
        );
        assert_eq!(
            check_refund(
                PaymentMethod::Card,
                PaymentStatus::Paid,
                OrderStatus::Delivered,
                Some("pi_1")
            ),
            Err(RefundRejection::OrderDelivered)
        );
    }

    #[test]
    fn paid_card_order_is_refundable() -> TestResult {
        check_refund(
            PaymentMethod::Card,
            PaymentStatus::Paid,
            OrderStatus::Processing,
            Some("pi_1"),
        )?;

        Ok(())
    }
}
