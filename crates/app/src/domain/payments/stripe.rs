//! Stripe-compatible HTTP client for checkout sessions, refunds and webhooks.

use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use storefront::payments::{
    ProviderEvent, construct_event,
    events::{ORDER_METADATA_KEY, USER_METADATA_KEY},
};

use crate::domain::payments::gateway::{
    CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway, Refund,
};

/// Configuration for connecting to the payment provider.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// API base address, e.g. `"https://api.stripe.com"`.
    pub api_base: String,

    /// Secret API key.
    pub secret_key: String,

    /// Secret used to sign webhook notifications.
    pub webhook_secret: String,

    /// Maximum accepted age of a webhook signature.
    pub webhook_tolerance: SignedDuration,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Where the customer lands after paying.
    pub success_url: String,

    /// Where the customer lands after abandoning checkout.
    pub cancel_url: String,

    /// Request timeout for provider calls.
    pub timeout: Duration,
}

/// HTTP client for the payment provider.
#[derive(Debug, Clone)]
pub struct StripeClient {
    config: StripeConfig,
    http: Client,
}

impl StripeClient {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, http })
    }

    fn session_form(&self, request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let order = request.order_uuid.to_string();
        let user = request.user_uuid.to_string();

        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.config.success_url.clone()),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            ("client_reference_id".to_string(), order.clone()),
            (format!("metadata[{ORDER_METADATA_KEY}]"), order.clone()),
            (format!("metadata[{USER_METADATA_KEY}]"), user.clone()),
            (
                format!("payment_intent_data[metadata][{ORDER_METADATA_KEY}]"),
                order,
            ),
            (
                format!("payment_intent_data[metadata][{USER_METADATA_KEY}]"),
                user,
            ),
        ];

        for (index, line) in request.charged_lines().into_iter().enumerate() {
            let prefix = format!("line_items[{index}]");

            form.extend([
                (
                    format!("{prefix}[price_data][currency]"),
                    self.config.currency.clone(),
                ),
                (
                    format!("{prefix}[price_data][product_data][name]"),
                    line.name,
                ),
                (
                    format!("{prefix}[price_data][unit_amount]"),
                    line.unit_amount.to_string(),
                ),
                (format!("{prefix}[quantity]"), line.quantity.to_string()),
            ]);
        }

        form
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        idempotency_key: &str,
        form: &[(String, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.config.api_base);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await?;

        parse_response(path, response).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    path: &str,
    response: Response,
) -> Result<T, GatewayError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        return Err(GatewayError::UnexpectedResponse(format!(
            "{path} failed with status {status}: {text}"
        )));
    }

    Ok(response.json().await?)
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    #[serde(default)]
    payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    status: String,
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let form = self.session_form(&request);

        let session: SessionResponse = self
            .post_form(
                "/v1/checkout/sessions",
                &request.order_uuid.to_string(),
                &form,
            )
            .await?;

        let url = session.url.ok_or_else(|| {
            GatewayError::UnexpectedResponse(format!("session {} has no url", session.id))
        })?;

        Ok(CheckoutSession {
            session_id: session.id,
            payment_intent_id: session.payment_intent,
            url,
        })
    }

    async fn create_refund(
        &self,
        payment_reference: &str,
        idempotency_key: &str,
    ) -> Result<Refund, GatewayError> {
        let form = [("payment_intent".to_string(), payment_reference.to_string())];

        let refund: RefundResponse = self
            .post_form("/v1/refunds", idempotency_key, &form)
            .await?;

        Ok(Refund {
            refund_id: refund.id,
            status: refund.status,
        })
    }

    fn construct_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<ProviderEvent, GatewayError> {
        Ok(construct_event(
            payload,
            signature,
            &self.config.webhook_secret,
            Timestamp::now(),
            self.config.webhook_tolerance,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use storefront::{
        charges::{ChargeSchedule, OrderCharges},
        payments::{ProviderEventKind, SignatureError, WebhookError, signature},
    };
    use testresult::TestResult;

    use crate::domain::{
        orders::records::OrderUuid,
        payments::gateway::CheckoutLine,
        users::UserUuid,
    };

    use super::*;

    fn client() -> Result<StripeClient, GatewayError> {
        StripeClient::new(StripeConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            secret_key: "sk_test".to_string(),
            webhook_secret: "whsec_test".to_string(),
            webhook_tolerance: SignedDuration::from_secs(300),
            currency: "usd".to_string(),
            success_url: "https://shop.test/success".to_string(),
            cancel_url: "https://shop.test/cancel".to_string(),
            timeout: Duration::from_secs(1),
        })
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn session_form_carries_metadata_and_lines() -> TestResult {
        let client = client()?;
        let order = OrderUuid::new();
        let user = UserUuid::new();

        let request = CheckoutSessionRequest {
            order_uuid: order,
            user_uuid: user,
            lines: vec![CheckoutLine {
                name: "Mug".to_string(),
                unit_amount: 1_200,
                quantity: 2,
            }],
            charges: OrderCharges::compute(
                2_400,
                0,
                ChargeSchedule {
                    tax_amount: 100,
                    delivery_charge: 0,
                },
            )?,
        };

        let form = client.session_form(&request);
        let order = order.to_string();
        let user = user.to_string();

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "metadata[order_uuid]"), Some(order.as_str()));
        assert_eq!(value(&form, "metadata[user_uuid]"), Some(user.as_str()));
        assert_eq!(
            value(&form, "payment_intent_data[metadata][order_uuid]"),
            Some(order.as_str())
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][unit_amount]"),
            Some("1200")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&form, "line_items[1][price_data][product_data][name]"),
            Some("Tax")
        );
        assert_eq!(value(&form, "line_items[2][quantity]"), None);

        Ok(())
    }

    #[test]
    fn construct_event_verifies_with_webhook_secret() -> TestResult {
        let client = client()?;
        let order = OrderUuid::new();

        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "payment_intent": "pi_1",
                "metadata": { "order_uuid": order.to_string() }
            }}
        }))?;

        let header = signature::sign(&payload, "whsec_test", Timestamp::now())?;

        let event = client.construct_event(&payload, &header)?;

        assert_eq!(event.id, "evt_1");
        assert!(matches!(
            event.kind,
            ProviderEventKind::CheckoutCompleted(ref object)
                if object.order == Some(order.into_uuid())
        ));

        Ok(())
    }

    #[test]
    fn construct_event_rejects_foreign_signature() -> TestResult {
        let client = client()?;
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#;

        let header = signature::sign(payload, "whsec_other", Timestamp::now())?;

        let result = client.construct_event(payload, &header);

        assert!(
            matches!(
                result,
                Err(GatewayError::Webhook(WebhookError::Signature(
                    SignatureError::Mismatch
                )))
            ),
            "expected signature mismatch, got {result:?}"
        );

        Ok(())
    }
}
