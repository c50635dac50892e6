//! Cart Summary Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    carts::{errors::into_status_error, models::CartSummaryResponse},
    extensions::*,
    state::State,
};

/// Cart Summary Handler
#[endpoint(
    tags("carts"),
    summary = "Cart Summary",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Item count, total and lines"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<CartSummaryResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let principal = depot.principal_or_401()?;

    let summary = state
        .app
        .carts
        .get_cart_summary(principal.user)
        .await
        .map_err(into_status_error)?;

    Ok(Json(summary.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use storefront_app::domain::carts::records::CartSummary;

    use crate::test_helpers::{Mocks, customer_service, make_cart};

    use super::*;

    #[tokio::test]
    async fn test_summary_counts_units() -> TestResult {
        let mut mocks = Mocks::default();
        let summary = CartSummary::from(make_cart(vec![(300, 2), (100, 3)]));

        mocks
            .carts
            .expect_get_cart_summary()
            .once()
            .return_once(move |_| Ok(summary));

        let body: CartSummaryResponse = TestClient::get("http://example.com/cart/summary")
            .send(&customer_service(
                mocks,
                Router::with_path("cart/summary").get(handler),
            ))
            .await
            .take_json()
            .await?;

        assert_eq!(body.item_count, 5);
        assert_eq!(body.total, 900);

        Ok(())
    }
}
