//! Refund Order Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    extensions::*, orders::models::OrderResponse, payments::errors::into_status_error,
    state::State,
};

/// Refund Order Handler
///
/// Refunds a paid card order in full and cancels it.
#[endpoint(
    tags("admin"),
    summary = "Refund Order",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Order refunded and cancelled"),
        (status_code = StatusCode::BAD_REQUEST, description = "Order cannot be refunded"),
        (status_code = StatusCode::FORBIDDEN, description = "Admin access required"),
        (status_code = StatusCode::NOT_FOUND, description = "Order not found"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Payment provider unavailable"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    order: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    depot.admin_or_403()?;

    let order = state
        .app
        .payments
        .refund_order(order.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(order.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use storefront::{
        orders::{OrderStatus, PaymentMethod, PaymentStatus},
        payments::RefundRejection,
    };
    use storefront_app::domain::{
        orders::records::OrderUuid,
        payments::{GatewayError, PaymentsServiceError},
    };

    use crate::test_helpers::{Mocks, admin_service, make_order};

    use super::*;

    fn make_service(mocks: Mocks) -> Service {
        admin_service(
            mocks,
            Router::with_path("admin/orders/{order}/refund").post(handler),
        )
    }

    #[tokio::test]
    async fn test_refund_returns_refunded_order() -> TestResult {
        let mut mocks = Mocks::default();
        let uuid = OrderUuid::new();
        let order = make_order(
            uuid,
            PaymentMethod::Card,
            OrderStatus::Cancelled,
            PaymentStatus::Refunded,
        );

        mocks
            .payments
            .expect_refund_order()
            .once()
            .withf(move |o| *o == uuid)
            .return_once(move |_| Ok(order));

        let body: OrderResponse =
            TestClient::post(format!("http://example.com/admin/orders/{uuid}/refund"))
                .send(&make_service(mocks))
                .await
                .take_json()
                .await?;

        assert_eq!(body.payment_status, "REFUNDED");
        assert_eq!(body.order_status, "CANCELLED");

        Ok(())
    }

    #[tokio::test]
    async fn test_refund_unpaid_order_returns_400() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_refund_order()
            .once()
            .return_once(|_| {
                Err(PaymentsServiceError::Refund(
                    RefundRejection::PaymentNotCompleted,
                ))
            });

        let res = TestClient::post(format!(
            "http://example.com/admin/orders/{}/refund",
            Uuid::now_v7()
        ))
        .send(&make_service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_refund_provider_failure_returns_502() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_refund_order()
            .once()
            .return_once(|_| {
                Err(PaymentsServiceError::PaymentProvider(
                    GatewayError::UnexpectedResponse("card_declined".to_string()),
                ))
            });

        let res = TestClient::post(format!(
            "http://example.com/admin/orders/{}/refund",
            Uuid::now_v7()
        ))
        .send(&make_service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_GATEWAY));

        Ok(())
    }
}
