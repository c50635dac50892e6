//! App Router

use salvo::Router;

use crate::{auth, carts, coupons, orders, payments};

/// Routes for authenticated customers and admins, plus the unauthenticated
/// provider webhook.
pub(crate) fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("payment/webhook").post(payments::handlers::webhook::handler))
        .push(
            Router::new()
                .hoop(auth::middleware::authenticate)
                .push(cart_router())
                .push(
                    Router::with_path("payment/checkout-session")
                        .post(payments::handlers::checkout::handler),
                )
                .push(orders_router())
                .push(admin_router()),
        )
}

fn cart_router() -> Router {
    Router::with_path("cart")
        .get(carts::handlers::get::handler)
        .post(carts::handlers::add::handler)
        .delete(carts::handlers::clear::handler)
        .push(Router::with_path("summary").get(carts::handlers::summary::handler))
        .push(
            Router::with_path("coupon")
                .post(coupons::handlers::apply::handler)
                .delete(coupons::handlers::remove::handler),
        )
        .push(
            Router::with_path("item")
                .push(Router::with_path("quantity").patch(carts::handlers::quantity::handler))
                .push(
                    Router::with_path("{item}")
                        .delete(carts::handlers::remove::handler)
                        .push(
                            Router::with_path("increment")
                                .post(carts::handlers::increment::handler),
                        )
                        .push(
                            Router::with_path("decrement")
                                .post(carts::handlers::decrement::handler),
                        ),
                ),
        )
}

fn orders_router() -> Router {
    Router::with_path("orders")
        .get(orders::handlers::index::handler)
        .push(
            Router::with_path("{order}")
                .get(orders::handlers::get::handler)
                .push(Router::with_path("cancel").put(orders::handlers::cancel::handler)),
        )
}

fn admin_router() -> Router {
    Router::with_path("admin")
        .hoop(auth::middleware::require_admin)
        .push(
            Router::with_path("coupons")
                .get(coupons::handlers::index::handler)
                .post(coupons::handlers::create::handler),
        )
        .push(
            Router::with_path("orders")
                .get(orders::admin::index::handler)
                .push(
                    Router::with_path("{order}")
                        .get(orders::admin::get::handler)
                        .delete(orders::admin::delete::handler)
                        .push(Router::with_path("status").put(orders::admin::status::handler))
                        .push(Router::with_path("refund").post(orders::admin::refund::handler)),
                ),
        )
}
