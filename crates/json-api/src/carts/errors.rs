//! Errors

use salvo::http::StatusError;
use tracing::error;

use storefront_app::domain::carts::CartsServiceError;

pub(crate) fn into_status_error(error: CartsServiceError) -> StatusError {
    match error {
        CartsServiceError::NotFound => StatusError::not_found().brief("Cart item not found"),
        CartsServiceError::Forbidden => {
            StatusError::forbidden().brief("Cart item belongs to another user")
        }
        CartsServiceError::InvalidQuantity | CartsServiceError::QuantityBelowMinimum => {
            StatusError::bad_request().brief(error.to_string())
        }
        CartsServiceError::InsufficientStock { available } => {
            StatusError::bad_request().brief(format!("Only {available} units available"))
        }
        CartsServiceError::Charges(source) => {
            StatusError::bad_request().brief(source.to_string())
        }
        CartsServiceError::AlreadyExists => {
            StatusError::conflict().brief("Cart item already exists")
        }
        CartsServiceError::InvalidReference => {
            StatusError::not_found().brief("Product not found")
        }
        CartsServiceError::MissingRequiredData => {
            StatusError::bad_request().brief("Invalid cart payload")
        }
        CartsServiceError::InvalidData => {
            error!("cart invariant violated in storage");

            StatusError::bad_request().brief("Invalid cart payload")
        }
        CartsServiceError::Sql(source) => {
            error!("cart storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}
