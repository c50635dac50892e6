//! Errors

use salvo::http::StatusError;
use tracing::error;

use storefront_app::domain::orders::OrdersServiceError;

pub(crate) fn into_status_error(error: OrdersServiceError) -> StatusError {
    match error {
        OrdersServiceError::NotFound => StatusError::not_found().brief("Order not found"),
        OrdersServiceError::Forbidden => {
            StatusError::forbidden().brief("Order belongs to another user")
        }
        OrdersServiceError::EmptyCart => StatusError::bad_request().brief("Cart is empty"),
        OrdersServiceError::InsufficientStock {
            product,
            available,
            requested,
        } => StatusError::bad_request().brief(format!(
            "Only {available} units of product {product} available, {requested} requested"
        )),
        OrdersServiceError::NotCancellable(rejection) => {
            StatusError::conflict().brief(rejection.to_string())
        }
        OrdersServiceError::IllegalTransition(transition) => {
            StatusError::conflict().brief(transition.to_string())
        }
        OrdersServiceError::Coupon(rejection) => {
            StatusError::bad_request().brief(rejection.to_string())
        }
        OrdersServiceError::Refund(rejection) => {
            StatusError::bad_request().brief(rejection.to_string())
        }
        OrdersServiceError::Charges(source) => {
            StatusError::bad_request().brief(source.to_string())
        }
        OrdersServiceError::PaymentProvider(source) => {
            error!("payment provider call failed: {source}");

            StatusError::bad_gateway().brief("Payment provider unavailable")
        }
        OrdersServiceError::AlreadyExists => {
            StatusError::conflict().brief("Order already exists")
        }
        OrdersServiceError::InvalidReference | OrdersServiceError::MissingRequiredData => {
            StatusError::bad_request().brief("Invalid order payload")
        }
        OrdersServiceError::InvalidData => {
            error!("order invariant violated in storage");

            StatusError::bad_request().brief("Invalid order payload")
        }
        OrdersServiceError::Sql(source) => {
            error!("order storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use storefront::orders::{CancellationRejection, OrderStatus, TransitionError};
    use storefront_app::domain::payments::GatewayError;

    use super::*;

    #[test]
    fn illegal_transition_is_a_conflict() {
        let error = into_status_error(OrdersServiceError::IllegalTransition(TransitionError {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing,
        }));

        assert_eq!(error.code, StatusCode::CONFLICT);
        assert_eq!(error.brief, "cannot move order from DELIVERED to PROCESSING");
    }

    #[test]
    fn delivered_orders_cannot_be_cancelled() {
        let error = into_status_error(OrdersServiceError::NotCancellable(
            CancellationRejection::AlreadyDelivered,
        ));

        assert_eq!(error.code, StatusCode::CONFLICT);
    }

    #[test]
    fn provider_details_stay_out_of_the_response() {
        let error = into_status_error(OrdersServiceError::PaymentProvider(
            GatewayError::UnexpectedResponse("sk_live_secret leaked".to_string()),
        ));

        assert_eq!(error.code, StatusCode::BAD_GATEWAY);
        assert!(!error.brief.contains("sk_live"));
    }
}
