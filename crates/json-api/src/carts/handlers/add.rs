//! Add Cart Item Handler

use std::sync::Arc;

use salvo::{oapi::extract::JsonBody, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_app::domain::carts::data::NewCartItem;

use crate::{
    carts::{errors::into_status_error, models::CartResponse},
    extensions::*,
    state::State,
};

/// Add Cart Item Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AddCartItemRequest {
    /// Product to add
    pub product_uuid: Uuid,

    /// Units to add, at least one
    pub quantity: u32,
}

impl From<AddCartItemRequest> for NewCartItem {
    fn from(request: AddCartItemRequest) -> Self {
        NewCartItem {
            product_uuid: request.product_uuid.into(),
            quantity: request.quantity,
        }
    }
}

/// Add Cart Item Handler
///
/// Adding a product that is already in the cart increases that line's
/// quantity.
#[endpoint(
    tags("carts"),
    summary = "Add Item to Cart",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Item added"),
        (status_code = StatusCode::NOT_FOUND, description = "Product not found"),
        (status_code = StatusCode::BAD_REQUEST, description = "Invalid quantity or insufficient stock"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<AddCartItemRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;

    let cart = state
        .app
        .carts
        .add_item(principal.user, json.into_inner().into())
        .await
        .map_err(into_status_error)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(cart.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;
    use serde_json::json;
    use testresult::TestResult;

    use storefront_app::domain::carts::CartsServiceError;

    use crate::test_helpers::{Mocks, TEST_USER, customer_service, make_cart};

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        customer_service(mocks, Router::with_path("cart").post(handler))
    }

    #[tokio::test]
    async fn test_add_returns_201() -> TestResult {
        let mut mocks = Mocks::default();
        let product = Uuid::now_v7();

        mocks
            .carts
            .expect_add_item()
            .once()
            .withf(move |user, item| {
                *user == TEST_USER
                    && item.product_uuid.into_uuid() == product
                    && item.quantity == 2
            })
            .return_once(|_, _| Ok(make_cart(vec![(500, 2)])));

        let res = TestClient::post("http://example.com/cart")
            .json(&json!({ "product_uuid": product, "quantity": 2 }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_beyond_stock_returns_400() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .carts
            .expect_add_item()
            .once()
            .return_once(|_, _| Err(CartsServiceError::InsufficientStock { available: 1 }));

        let res = TestClient::post("http://example.com/cart")
            .json(&json!({ "product_uuid": Uuid::now_v7(), "quantity": 5 }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_unknown_product_returns_404() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .carts
            .expect_add_item()
            .once()
            .return_once(|_, _| Err(CartsServiceError::InvalidReference));

        let res = TestClient::post("http://example.com/cart")
            .json(&json!({ "product_uuid": Uuid::now_v7(), "quantity": 1 }))
            .send(&make_service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_malformed_body_returns_400() -> TestResult {
        let res = TestClient::post("http://example.com/cart")
            .json(&json!({ "product_uuid": "not-a-uuid", "quantity": 1 }))
            .send(&make_service(Mocks::default()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
