//! Decrement Cart Item Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    carts::{errors::into_status_error, models::CartResponse},
    extensions::*,
    state::State,
};

/// Decrement Cart Item Handler
///
/// Removes one unit from a cart line. A line never drops below one unit;
/// delete the line instead.
#[endpoint(
    tags("carts"),
    summary = "Decrement Cart Item",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Quantity decreased"),
        (status_code = StatusCode::BAD_REQUEST, description = "Quantity cannot go below 1"),
        (status_code = StatusCode::FORBIDDEN, description = "Cart item belongs to another user"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart item not found"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    item: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;

    let cart = state
        .app
        .carts
        .decrement_item(principal.user, item.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(cart.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use storefront_app::domain::carts::CartsServiceError;

    use crate::test_helpers::{Mocks, customer_service};

    use super::*;

    #[tokio::test]
    async fn test_decrement_last_unit_returns_400() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .carts
            .expect_decrement_item()
            .once()
            .return_once(|_, _| Err(CartsServiceError::QuantityBelowMinimum));

        let mut res = TestClient::post(format!(
            "http://example.com/cart/item/{}/decrement",
            Uuid::now_v7()
        ))
        .send(&customer_service(
            mocks,
            Router::with_path("cart/item/{item}/decrement").post(handler),
        ))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        assert!(res.take_string().await?.contains("quantity cannot go below 1"));

        Ok(())
    }
}
