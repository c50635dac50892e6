//! Payment Provider Config

use std::time::Duration;

use clap::Args;
use jiff::SignedDuration;
use storefront_app::domain::payments::StripeConfig;

/// Payment provider settings.
#[derive(Debug, Args)]
pub struct PaymentsConfig {
    /// Provider API base address
    #[arg(long, env = "PAYMENT_API_BASE", default_value = "https://api.stripe.com")]
    pub payment_api_base: String,

    /// Provider secret API key
    #[arg(long, env = "PAYMENT_SECRET_KEY", hide_env_values = true)]
    pub payment_secret_key: String,

    /// Secret the provider signs webhooks with
    #[arg(long, env = "PAYMENT_WEBHOOK_SECRET", hide_env_values = true)]
    pub payment_webhook_secret: String,

    /// Maximum accepted webhook signature age in seconds
    #[arg(long, env = "PAYMENT_WEBHOOK_TOLERANCE_SECONDS", default_value_t = 300)]
    pub payment_webhook_tolerance_seconds: i64,

    /// Checkout currency code
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = "usd")]
    pub payment_currency: String,

    /// Where customers land after paying
    #[arg(long, env = "PAYMENT_SUCCESS_URL")]
    pub payment_success_url: String,

    /// Where customers land after abandoning checkout
    #[arg(long, env = "PAYMENT_CANCEL_URL")]
    pub payment_cancel_url: String,

    /// Provider request timeout in seconds
    #[arg(long, env = "PAYMENT_TIMEOUT_SECONDS", default_value_t = 10)]
    pub payment_timeout_seconds: u64,
}

impl PaymentsConfig {
    #[must_use]
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig {
            api_base: self.payment_api_base.trim_end_matches('/').to_string(),
            secret_key: self.payment_secret_key.clone(),
            webhook_secret: self.payment_webhook_secret.clone(),
            webhook_tolerance: SignedDuration::from_secs(self.payment_webhook_tolerance_seconds),
            currency: self.payment_currency.to_lowercase(),
            success_url: self.payment_success_url.clone(),
            cancel_url: self.payment_cancel_url.clone(),
            timeout: Duration::from_secs(self.payment_timeout_seconds),
        }
    }
}
