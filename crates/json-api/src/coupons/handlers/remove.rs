//! Remove Coupon Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{coupons::errors::into_status_error, extensions::*, state::State};

/// Remove Coupon Handler
#[endpoint(
    tags("coupons"),
    summary = "Remove Coupon from Cart",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Coupon detached"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<StatusCode, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;

    state
        .app
        .coupons
        .remove_coupon_from_cart(principal.user)
        .await
        .map_err(into_status_error)?;

    Ok(StatusCode::NO_CONTENT)
}
