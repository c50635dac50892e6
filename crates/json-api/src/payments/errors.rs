//! Errors

use salvo::http::StatusError;
use tracing::error;

use storefront_app::domain::payments::PaymentsServiceError;

pub(crate) fn into_status_error(error: PaymentsServiceError) -> StatusError {
    match error {
        PaymentsServiceError::NotFound => StatusError::not_found().brief("Order not found"),
        PaymentsServiceError::InvalidWebhook(source) => {
            StatusError::bad_request().brief(source.to_string())
        }
        PaymentsServiceError::Refund(rejection) => {
            StatusError::bad_request().brief(rejection.to_string())
        }
        PaymentsServiceError::PaymentProvider(source) => {
            error!("payment provider call failed: {source}");

            StatusError::bad_gateway().brief("Payment provider unavailable")
        }
        PaymentsServiceError::AlreadyExists => {
            StatusError::conflict().brief("Payment event already recorded")
        }
        PaymentsServiceError::InvalidReference | PaymentsServiceError::MissingRequiredData => {
            StatusError::bad_request().brief("Invalid payment payload")
        }
        PaymentsServiceError::InvalidData => {
            error!("payment invariant violated in storage");

            StatusError::bad_request().brief("Invalid payment payload")
        }
        PaymentsServiceError::Sql(source) => {
            error!("payment storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}
