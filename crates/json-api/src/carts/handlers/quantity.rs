//! Set Cart Item Quantity Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, models::CartResponse},
    extensions::*,
    state::State,
};

/// Set Quantity Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct SetQuantityRequest {
    /// Cart line to change
    pub item_uuid: Uuid,

    /// New quantity, at least one
    pub quantity: u32,
}

/// Set Cart Item Quantity Handler
#[endpoint(
    tags("carts"),
    summary = "Set Cart Item Quantity",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Quantity updated"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid quantity or insufficient stock"),
        (status_code = StatusCode::FORBIDDEN, description = "Cart item belongs to another user"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart item not found"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<SetQuantityRequest>,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;
    let request = json.into_inner();

    let cart = state
        .app
        .carts
        .set_quantity(principal.user, request.item_uuid.into(), request.quantity)
        .await
        .map_err(into_status_error)?;

    Ok(Json(cart.into()))
}
