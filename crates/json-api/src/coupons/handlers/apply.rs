//! Apply Coupon Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    coupons::{errors::into_status_error, models::AppliedCouponResponse},
    extensions::*,
    state::State,
};

/// Apply Coupon Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ApplyCouponRequest {
    /// Coupon code, matched exactly
    pub code: String,
}

/// Apply Coupon Handler
///
/// Validates a coupon against the caller's cart and attaches it. The
/// discount is taken when the order is placed.
#[endpoint(
    tags("coupons"),
    summary = "Apply Coupon to Cart",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Coupon attached"),
        (status_code = StatusCode::BAD_REQUEST, description = "Coupon cannot be used"),
        (status_code = StatusCode::NOT_FOUND, description = "Coupon not found"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<ApplyCouponRequest>,
    depot: &mut Depot,
) -> Result<Json<AppliedCouponResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;

    let applied = state
        .app
        .coupons
        .apply_coupon(principal.user, json.into_inner().code)
        .await
        .map_err(into_status_error)?;

    Ok(Json(applied.into()))
}
