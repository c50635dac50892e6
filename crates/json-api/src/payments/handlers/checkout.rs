//! Checkout Session Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront::orders::PaymentMethod;
use storefront_app::domain::orders::data::NewOrder;

use crate::{
    extensions::*,
    observability::observe_order_placed,
    orders::{errors::into_status_error, models::OrderResponse},
    state::State,
};

/// Checkout Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CheckoutRequest {
    /// Delivery address
    pub address_uuid: Uuid,

    /// CASH_ON_DELIVERY or CARD
    pub payment_method: String,
}

/// Checkout Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CheckoutResponse {
    pub order: OrderResponse,

    /// Hosted payment page; only set for card orders
    pub checkout_url: Option<String>,
}

/// Checkout Session Handler
///
/// Turns the caller's cart into an order. Card orders also get a hosted
/// checkout session from the payment provider.
#[endpoint(
    tags("payments"),
    summary = "Place Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Order placed"),
        (status_code = StatusCode::BAD_REQUEST, description = "Empty cart, insufficient stock or unusable coupon"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Payment provider unavailable"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CheckoutRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CheckoutResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;
    let request = json.into_inner();

    let order = NewOrder {
        address_uuid: request.address_uuid.into(),
        payment_method: request
            .payment_method
            .parse::<PaymentMethod>()
            .or_400("could not parse \"payment_method\"")?,
    };

    let payment_method = order.payment_method;

    let placed = state
        .app
        .orders
        .create_order(principal.user, order)
        .await
        .map_err(into_status_error)?;

    observe_order_placed(payment_method.as_str());

    res.status_code(StatusCode::CREATED);

    Ok(Json(CheckoutResponse {
        order: placed.order.into(),
        checkout_url: placed.checkout_url,
    }))
}
