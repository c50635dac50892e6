//! Payment Webhook Handler

use std::sync::Arc;

use salvo::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use storefront_app::domain::payments::{PaymentsServiceError, WebhookOutcome};

use crate::{
    extensions::*,
    observability::{WebhookDisposition, observe_webhook},
    state::State,
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook Acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct WebhookResponse {
    /// Whether the notification was verified and accepted
    pub received: bool,
}

/// Payment Webhook Handler
///
/// Receives payment provider notifications. The raw body is verified
/// against the signature header before anything is decoded. Rejected
/// notifications are still answered with 200 so the provider stops
/// retrying them; storage failures return 500 so it retries.
#[endpoint(
    tags("payments"),
    summary = "Payment Provider Webhook",
    responses(
        (status_code = StatusCode::OK, description = "Notification acknowledged"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<WebhookResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let Some(signature) = req.header::<String>(SIGNATURE_HEADER) else {
        warn!("webhook rejected: missing signature header");
        observe_webhook(WebhookDisposition::Rejected);

        return Ok(Json(WebhookResponse { received: false }));
    };

    let payload = match req.payload().await {
        Ok(payload) => payload.to_vec(),
        Err(source) => {
            warn!("webhook rejected: unreadable body: {source}");
            observe_webhook(WebhookDisposition::Rejected);

            return Ok(Json(WebhookResponse { received: false }));
        }
    };

    match state.app.payments.handle_event(payload, signature).await {
        Ok(WebhookOutcome::Applied {
            order,
            order_status,
            payment_status,
        }) => {
            info!(order_uuid = %order, %order_status, %payment_status, "webhook applied");
            observe_webhook(WebhookDisposition::Applied);

            Ok(Json(WebhookResponse { received: true }))
        }
        Ok(WebhookOutcome::Ignored(reason)) => {
            info!(?reason, "webhook ignored");
            observe_webhook(WebhookDisposition::Ignored);

            Ok(Json(WebhookResponse { received: true }))
        }
        Err(PaymentsServiceError::InvalidWebhook(source)) => {
            warn!("webhook rejected: {source}");
            observe_webhook(WebhookDisposition::Rejected);

            Ok(Json(WebhookResponse { received: false }))
        }
        Err(error) => {
            error!("failed to handle webhook: {error}");
            observe_webhook(WebhookDisposition::Failed);

            Err(StatusError::internal_server_error())
        }
    }
}
