//! Errors

use salvo::http::StatusError;
use tracing::error;

use storefront_app::domain::coupons::CouponsServiceError;

pub(crate) fn into_status_error(error: CouponsServiceError) -> StatusError {
    match error {
        CouponsServiceError::NotFound => StatusError::not_found().brief("Coupon not found"),
        CouponsServiceError::EmptyCart => StatusError::bad_request().brief("Cart is empty"),
        CouponsServiceError::Rejected(rejection) => {
            StatusError::bad_request().brief(rejection.to_string())
        }
        CouponsServiceError::AlreadyExists => {
            StatusError::conflict().brief("Coupon code already exists")
        }
        CouponsServiceError::InvalidReference | CouponsServiceError::MissingRequiredData => {
            StatusError::bad_request().brief("Invalid coupon payload")
        }
        CouponsServiceError::InvalidData => {
            error!("coupon invariant violated in storage");

            StatusError::bad_request().brief("Invalid coupon payload")
        }
        CouponsServiceError::Sql(source) => {
            error!("coupon storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}
