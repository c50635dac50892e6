//! Coupons Index Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    coupons::{errors::into_status_error, models::CouponResponse},
    extensions::*,
    state::State,
};

/// Coupons Index Handler
///
/// Lists every coupon, newest first.
#[endpoint(
    tags("admin"),
    summary = "List Coupons",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "All coupons"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin access required"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<Vec<CouponResponse>>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    depot.admin_or_403()?;

    let coupons = state
        .app
        .coupons
        .list_coupons()
        .await
        .map_err(into_status_error)?;

    Ok(Json(coupons.into_iter().map(CouponResponse::from).collect()))
}
