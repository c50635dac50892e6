//! Admin Orders Index Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{oapi::extract::QueryParam, prelude::*};
use uuid::Uuid;

use storefront::orders::{OrderStatus, Page, PaymentMethod};
use storefront_app::domain::orders::data::OrderFilter;

use crate::{
    extensions::*,
    orders::{errors::into_status_error, models::OrdersPageResponse},
    state::State,
};

fn parse_timestamp(value: Option<String>, name: &str) -> Result<Option<Timestamp>, StatusError> {
    value
        .map(|value| value.parse::<Timestamp>())
        .transpose()
        .or_400(&format!("could not parse \"{name}\" query parameter"))
}

/// Admin Orders Index Handler
///
/// Filters are combined; unset filters match everything. `limit` is clamped
/// to 1..=100 and defaults to 10.
#[endpoint(
    tags("admin"),
    summary = "List All Orders",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "A page of orders"),
        (status_code = StatusCode::BAD_REQUEST, description = "Malformed filter"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin access required"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    status: QueryParam<String, false>,
    payment_method: QueryParam<String, false>,
    user: QueryParam<Uuid, false>,
    from: QueryParam<String, false>,
    to: QueryParam<String, false>,
    page: QueryParam<u32, false>,
    limit: QueryParam<u32, false>,
    depot: &mut Depot,
) -> Result<Json<OrdersPageResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    depot.admin_or_403()?;

    let filter = OrderFilter {
        order_status: status
            .into_inner()
            .map(|value| value.parse::<OrderStatus>())
            .transpose()
            .or_400("could not parse \"status\" query parameter")?,
        payment_method: payment_method
            .into_inner()
            .map(|value| value.parse::<PaymentMethod>())
            .transpose()
            .or_400("could not parse \"payment_method\" query parameter")?,
        user_uuid: user.into_inner().map(Into::into),
        created_from: parse_timestamp(from.into_inner(), "from")?,
        created_to: parse_timestamp(to.into_inner(), "to")?,
        page: Page::new(page.into_inner(), limit.into_inner()),
    };

    let page = state
        .app
        .orders
        .admin_list_orders(filter)
        .await
        .map_err(into_status_error)?;

    Ok(Json(page.into()))
}
