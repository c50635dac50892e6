//! Payment Gateway
//!
//! The seam between order/payment services and the external payment
//! provider. Production uses [`super::stripe::StripeClient`].

use async_trait::async_trait;
use mockall::automock;
use storefront::{
    charges::OrderCharges,
    payments::{ProviderEvent, WebhookError},
};
use thiserror::Error;

use crate::domain::{orders::records::OrderUuid, users::UserUuid};

/// A priced line on a checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount: u64,
    pub quantity: u32,
}

/// Everything the provider needs to take payment for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub order_uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub lines: Vec<CheckoutLine>,
    pub charges: OrderCharges,
}

impl CheckoutSessionRequest {
    /// Lines to charge, summing to exactly `charges.total`.
    ///
    /// Without a discount the order lines are itemised, followed by tax and
    /// delivery lines when those are non-zero. Discounted orders are charged
    /// as a single line for the order total.
    #[must_use]
    pub fn charged_lines(&self) -> Vec<CheckoutLine> {
        if self.charges.discount > 0 {
            return vec![CheckoutLine {
                name: format!("Order {}", self.order_uuid),
                unit_amount: self.charges.total,
                quantity: 1,
            }];
        }

        let mut lines = self.lines.clone();

        for (name, amount) in [
            ("Tax", self.charges.tax_amount),
            ("Delivery", self.charges.delivery_charge),
        ] {
            if amount > 0 {
                lines.push(CheckoutLine {
                    name: name.to_string(),
                    unit_amount: amount,
                    quantity: 1,
                });
            }
        }

        lines
    }
}

/// A hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub url: String,
}

/// A refund issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refund {
    pub refund_id: String,
    pub status: String,
}

/// Idempotency key used for an order's refund, so retries never refund twice.
#[must_use]
pub fn refund_idempotency_key(order: OrderUuid) -> String {
    format!("refund-{order}")
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-2xx response or an unexpected body.
    #[error("unexpected response from payment provider: {0}")]
    UnexpectedResponse(String),

    /// A webhook notification was rejected.
    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for an order.
    ///
    /// The order uuid is used as the idempotency key.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Refund a captured payment in full.
    async fn create_refund(
        &self,
        payment_reference: &str,
        idempotency_key: &str,
    ) -> Result<Refund, GatewayError>;

    /// Verify a webhook signature and decode the event.
    fn construct_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProviderEvent, GatewayError>;
}
